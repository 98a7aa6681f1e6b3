//! Outgoing HTTP response type.
//!
//! Unlike a value returned from a handler, a [`Response`] here is a mutable
//! object threaded through the whole dispatch: before-hooks, the handler and
//! after-hooks all write into the same one.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for [`Response::bytes`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
    Css,          // text/css
    Csv,          // text/csv
    EventStream,  // text/event-stream  (SSE)
    Html,         // text/html; charset=utf-8
    Javascript,   // text/javascript
    Json,         // application/json
    OctetStream,  // application/octet-stream  (binary / file download)
    Pdf,          // application/pdf
    Png,          // image/png
    Svg,          // image/svg+xml
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Css         => "text/css",
            Self::Csv         => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::Html        => "text/html; charset=utf-8",
            Self::Javascript  => "text/javascript",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Pdf         => "application/pdf",
            Self::Png         => "image/png",
            Self::Svg         => "image/svg+xml",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// Starts as `200 OK` with content type `text/html; charset=utf-8` and an
/// empty body. The negotiated content type matters beyond the wire: a domain
/// failure is rendered as a diagnostic HTML page only when it contains `html`.
///
/// ```rust
/// use skiff::{ContentType, Response};
/// use http::StatusCode;
///
/// let mut res = Response::new();
/// res.status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
///
/// let mut xml = Response::new();
/// xml.bytes(ContentType::Xml, b"<ok/>".to_vec());
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) content_type: String,
    pub(crate) body: Vec<u8>,
    pub(crate) close: bool,
}

impl Default for Response {
    fn default() -> Self { Self::new() }
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: Vec::new(),
            content_type: ContentType::Html.as_str().to_owned(),
            body: Vec::new(),
            close: false,
        }
    }

    /// A fresh response carrying only a status and a body.
    pub(crate) fn with_body(status: StatusCode, content_type: ContentType, body: impl Into<Vec<u8>>) -> Self {
        let mut res = Self::new();
        res.status = status;
        res.bytes(content_type, body.into());
        res
    }

    pub fn status(&mut self, code: StatusCode) -> &mut Self {
        self.status = code;
        self
    }

    /// Sets a header, replacing any existing value with the same
    /// (case-insensitive) name. `content-type` is routed to
    /// [`set_content_type`](Response::set_content_type).
    pub fn header(&mut self, name: &str, value: &str) -> &mut Self {
        if name.eq_ignore_ascii_case("content-type") {
            return self.set_content_type(value);
        }
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(slot) => slot.1 = value.to_owned(),
            None => self.headers.push((name.to_owned(), value.to_owned())),
        }
        self
    }

    pub fn set_content_type(&mut self, value: &str) -> &mut Self {
        self.content_type = value.to_owned();
        self
    }

    /// `text/plain; charset=utf-8`.
    pub fn text(&mut self, body: impl Into<String>) -> &mut Self {
        self.bytes(ContentType::Text, body.into().into_bytes())
    }

    /// `text/html; charset=utf-8`.
    pub fn html(&mut self, body: impl Into<String>) -> &mut Self {
        self.bytes(ContentType::Html, body.into().into_bytes())
    }

    /// `application/json`. Pass bytes straight from the serializer.
    pub fn json(&mut self, body: Vec<u8>) -> &mut Self {
        self.bytes(ContentType::Json, body)
    }

    pub fn bytes(&mut self, content_type: ContentType, body: Vec<u8>) -> &mut Self {
        self.content_type = content_type.as_str().to_owned();
        self.body = body;
        self
    }

    /// `302 Found` to `location`.
    pub fn redirect(&mut self, location: &str) -> &mut Self {
        self.status = StatusCode::FOUND;
        self.header("location", location)
    }

    /// Forces `Connection: close` once this response is flushed.
    pub fn close(&mut self) -> &mut Self {
        self.close = true;
        self
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn content_type(&self) -> &str { &self.content_type }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn is_close(&self) -> bool { self.close }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        if name.eq_ignore_ascii_case("content-type") {
            return Some(&self.content_type);
        }
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Converts into the hyper representation.
    ///
    /// Fails when a handler set a header name or value that is not valid on
    /// the wire.
    pub(crate) fn into_inner(self) -> Result<http::Response<Full<Bytes>>, http::Error> {
        let mut builder = http::Response::builder()
            .status(self.status)
            .header(http::header::CONTENT_TYPE, self.content_type);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if self.close {
            builder = builder.header(http::header::CONNECTION, "close");
        }
        builder.body(Full::new(Bytes::from(self.body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_html_ok() {
        let res = Response::new();
        assert_eq!(res.status_code(), StatusCode::OK);
        assert!(res.content_type().contains("html"));
        assert!(res.body().is_empty());
    }

    #[test]
    fn header_replaces_case_insensitively() {
        let mut res = Response::new();
        res.header("X-Trace", "1").header("x-trace", "2");
        assert_eq!(res.get_header("X-TRACE"), Some("2"));
        assert_eq!(res.headers.len(), 1);

        res.header("Content-Type", "application/json");
        assert_eq!(res.content_type(), "application/json");
    }

    #[test]
    fn close_adds_connection_header() {
        let mut res = Response::new();
        res.text("bye").close();
        let inner = res.into_inner().unwrap();
        assert_eq!(inner.headers()[http::header::CONNECTION], "close");
        assert_eq!(inner.headers()[http::header::CONTENT_TYPE], "text/plain; charset=utf-8");
    }

    #[test]
    fn invalid_header_fails_conversion() {
        let mut res = Response::new();
        res.header("bad header", "x");
        assert!(res.into_inner().is_err());
    }
}
