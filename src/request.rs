//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;

use crate::method::Method;
use crate::session::Session;

/// An incoming HTTP request, body fully collected.
///
/// Cloning is cheap enough to publish a copy into the request-scoped
/// [`WebContext`](crate::WebContext): the body is a reference-counted
/// [`Bytes`].
#[derive(Clone)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: String,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) peer: Option<SocketAddr>,
    pub(crate) session: Option<Arc<dyn Session>>,
}

impl Request {
    /// Builds a request for `uri` with no headers and an empty body.
    ///
    /// `uri` may carry a query string. The routing path is the normalized
    /// path component; use [`Request::with_context_path`] when the app is
    /// mounted below a prefix.
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((p, q)) => (p, Some(q.to_owned())),
            None => (uri, None),
        };
        Self {
            method,
            uri: path.to_owned(),
            path: relative_path(path, ""),
            query,
            headers: Vec::new(),
            body: Bytes::new(),
            params: HashMap::new(),
            peer: None,
            session: None,
        }
    }

    /// Converts the head of a hyper request plus its collected body.
    pub(crate) fn from_parts(
        method: Method,
        parts: &http::request::Parts,
        body: Bytes,
        context_path: &str,
        peer: SocketAddr,
    ) -> Self {
        let raw = parts.uri.path();
        let headers = parts.headers.iter()
            .map(|(k, v)| (k.as_str().to_owned(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        Self {
            method,
            uri: raw.to_owned(),
            path: relative_path(raw, context_path),
            query: parts.uri.query().map(str::to_owned),
            headers,
            body,
            params: HashMap::new(),
            peer: Some(peer),
            session: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Recomputes the routing path relative to `context_path`.
    pub fn with_context_path(mut self, context_path: &str) -> Self {
        self.path = relative_path(&self.uri, context_path);
        self
    }

    pub fn method(&self) -> Method { self.method }
    /// The raw path as received, context path included.
    pub fn uri(&self) -> &str { &self.uri }
    /// The normalized path used for classification, hooks and routing.
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn peer(&self) -> Option<SocketAddr> { self.peer }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns a query-string parameter. No percent-decoding is applied.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.as_deref()?
            .split('&')
            .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    pub fn session(&self) -> Option<&Arc<dyn Session>> {
        self.session.as_ref()
    }

    /// Attaches a session. Typically called by a before-hook.
    pub fn set_session(&mut self, session: Arc<dyn Session>) {
        self.session = Some(session);
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("body_len", &self.body.len())
            .finish_non_exhaustive()
    }
}

/// Strips `context_path` from `uri` and normalizes the remainder: duplicate
/// slashes collapse, a trailing slash is dropped, the result starts with `/`.
pub(crate) fn relative_path(uri: &str, context_path: &str) -> String {
    let prefix = context_path.trim_end_matches('/');
    let rest = match uri.strip_prefix(prefix) {
        Some(rest) if !prefix.is_empty() && (rest.is_empty() || rest.starts_with('/')) => rest,
        _ => uri,
    };

    let mut path = String::with_capacity(rest.len() + 1);
    for segment in rest.split('/').filter(|s| !s.is_empty()) {
        path.push('/');
        path.push_str(segment);
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}
