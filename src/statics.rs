//! Static file serving.
//!
//! Requests classified as static never reach hooks or routes. They go
//! straight to a [`StaticFiles`] implementation, which owns its own I/O and
//! error rendering.

use std::path::{Component, Path, PathBuf};

use http::StatusCode;
use tracing::{debug, warn};

use crate::error::HandlerResult;
use crate::request::Request;
use crate::response::{ContentType, Response};

/// Serves a static resource for `path` into `res`.
pub trait StaticFiles: Send + Sync {
    fn serve(&self, req: &Request, res: &mut Response, path: &str) -> HandlerResult;
}

/// Serves files below a root directory.
///
/// `..` segments are rejected, directories fall back to `index.html`.
#[derive(Debug, Clone)]
pub struct StaticFileHandler {
    root: PathBuf,
    cache_control: Option<String>,
}

impl StaticFileHandler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), cache_control: None }
    }

    /// Sends `Cache-Control: public, max-age=<secs>` with every file.
    pub fn with_max_age(mut self, secs: u64) -> Self {
        self.cache_control = Some(format!("public, max-age={secs}"));
        self
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
            return None;
        }
        let full = self.root.join(relative);
        if full.is_dir() {
            return Some(full.join("index.html"));
        }
        Some(full)
    }

    fn not_found(res: &mut Response, path: &str) {
        res.status(StatusCode::NOT_FOUND)
            .text(format!("Not Found: {path}"));
    }
}

fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path).first_or_octet_stream().to_string()
}

impl StaticFiles for StaticFileHandler {
    fn serve(&self, _req: &Request, res: &mut Response, path: &str) -> HandlerResult {
        let Some(file) = self.resolve(path) else {
            warn!(path, "rejected static path");
            Self::not_found(res, path);
            return Ok(());
        };
        match std::fs::read(&file) {
            Ok(bytes) => {
                debug!(file = %file.display(), len = bytes.len(), "static file");
                res.bytes(ContentType::OctetStream, bytes)
                    .set_content_type(&content_type_for(&file));
                if let Some(cc) = &self.cache_control {
                    res.header("cache-control", cc);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::not_found(res, path),
            Err(e) => return Err(crate::DispatchError::other(e)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("skiff-statics-{name}-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("static")).unwrap();
        dir
    }

    #[test]
    fn serves_file_with_content_type() {
        let root = scratch_dir("serve");
        std::fs::write(root.join("static/app.css"), "body{}").unwrap();
        let files = StaticFileHandler::new(&root).with_max_age(60);

        let mut res = Response::new();
        let req = Request::new(Method::Get, "/static/app.css");
        files.serve(&req, &mut res, req.path()).unwrap();

        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.content_type(), "text/css");
        assert_eq!(res.body(), b"body{}");
        assert_eq!(res.get_header("cache-control"), Some("public, max-age=60"));
    }

    #[test]
    fn content_type_follows_the_extension() {
        let root = scratch_dir("types");
        std::fs::write(root.join("static/photo.webp"), [0u8; 4]).unwrap();
        std::fs::write(root.join("static/blob.zzunknown"), [1u8; 4]).unwrap();
        let files = StaticFileHandler::new(&root);
        let req = Request::new(Method::Get, "/");

        let mut res = Response::new();
        files.serve(&req, &mut res, "/static/photo.webp").unwrap();
        assert_eq!(res.content_type(), "image/webp");

        let mut res = Response::new();
        files.serve(&req, &mut res, "/static/blob.zzunknown").unwrap();
        assert_eq!(res.content_type(), "application/octet-stream");
    }

    #[test]
    fn missing_and_traversal_paths_are_404() {
        let root = scratch_dir("missing");
        let files = StaticFileHandler::new(&root);
        let req = Request::new(Method::Get, "/");

        let mut res = Response::new();
        files.serve(&req, &mut res, "/static/nope.js").unwrap();
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);

        let mut res = Response::new();
        files.serve(&req, &mut res, "/static/../../etc/passwd").unwrap();
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    }
}
