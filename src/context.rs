//! Request-scoped context.
//!
//! Hooks and handlers get the request and response explicitly. Collaborators
//! further down the call chain that cannot take them as arguments read them
//! from a thread-local slot instead.
//!
//! The slot holds copies, not the live values, so nothing here can alias the
//! `&mut` borrows the pipeline hands out. The dispatcher refreshes the copies
//! at every step: on entry, after each hook, once route parameters are bound,
//! and after the handler returns. Code called from inside a handler therefore
//! sees the request as the handler received it, with parameters and any
//! session a before-hook attached, and the response as the hooks left it.
//!
//! The slot is only ever filled through a [`ContextGuard`], whose `Drop`
//! empties it, so a pooled thread never carries a previous request into the
//! next one, whether the dispatch returned, failed or panicked.

use std::cell::RefCell;

use crate::request::Request;
use crate::response::Response;

struct Snapshot {
    request: Request,
    response: Response,
}

thread_local! {
    static CURRENT: RefCell<Option<Snapshot>> = const { RefCell::new(None) };
}

/// Access to the request and response currently being dispatched on this
/// thread.
pub struct WebContext;

impl WebContext {
    /// Publishes `request` and `response` for the lifetime of the returned
    /// guard.
    pub(crate) fn enter(request: &Request, response: &Response) -> ContextGuard {
        CURRENT.with(|slot| {
            let previous = slot.borrow_mut().replace(Snapshot {
                request: request.clone(),
                response: response.clone(),
            });
            debug_assert!(previous.is_none(), "request context already set on this thread");
        });
        ContextGuard { _private: () }
    }

    /// Refreshes the published copies. No-op outside a dispatch.
    pub(crate) fn sync(request: &Request, response: &Response) {
        CURRENT.with(|slot| {
            if let Some(current) = slot.borrow_mut().as_mut() {
                current.request.clone_from(request);
                current.response.clone_from(response);
            }
        });
    }

    /// Runs `f` with the current request, if one is published.
    pub fn with<R>(f: impl FnOnce(Option<&Request>) -> R) -> R {
        CURRENT.with(|slot| f(slot.borrow().as_ref().map(|s| &s.request)))
    }

    /// Runs `f` with the current response, if one is published.
    pub fn with_response<R>(f: impl FnOnce(Option<&Response>) -> R) -> R {
        CURRENT.with(|slot| f(slot.borrow().as_ref().map(|s| &s.response)))
    }

    /// A clone of the current request.
    pub fn current() -> Option<Request> {
        Self::with(|req| req.cloned())
    }

    /// A clone of the current response.
    pub fn response() -> Option<Response> {
        Self::with_response(|res| res.cloned())
    }

    pub fn is_set() -> bool {
        CURRENT.with(|slot| slot.borrow().is_some())
    }
}

/// Clears the request-scoped context when dropped.
#[must_use = "the context is cleared as soon as the guard is dropped"]
pub(crate) struct ContextGuard {
    _private: (),
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        // try_with: the guard may drop during thread teardown.
        let _ = CURRENT.try_with(|slot| slot.borrow_mut().take());
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::Method;

    #[test]
    fn guard_publishes_and_clears() {
        assert!(!WebContext::is_set());
        {
            let _guard = WebContext::enter(&Request::new(Method::Get, "/orders/9"), &Response::new());
            assert_eq!(WebContext::current().map(|r| r.path().to_owned()).as_deref(), Some("/orders/9"));
            assert_eq!(WebContext::response().map(|r| r.status_code()), Some(StatusCode::OK));
        }
        assert!(!WebContext::is_set());
    }

    #[test]
    fn sync_replaces_both_copies() {
        let req = Request::new(Method::Get, "/a");
        let mut res = Response::new();
        let _guard = WebContext::enter(&req, &res);

        res.status(StatusCode::ACCEPTED).header("x-trace", "t1");
        WebContext::sync(&req.clone().with_header("x-user", "ada"), &res);

        assert_eq!(WebContext::with(|r| r.and_then(|r| r.header("x-user")).map(str::to_owned)).as_deref(), Some("ada"));
        assert_eq!(WebContext::with_response(|r| r.map(Response::status_code)), Some(StatusCode::ACCEPTED));
        assert_eq!(WebContext::response().and_then(|r| r.get_header("x-trace").map(str::to_owned)).as_deref(), Some("t1"));
    }

    #[test]
    fn sync_outside_a_dispatch_is_ignored() {
        WebContext::sync(&Request::new(Method::Get, "/"), &Response::new());
        assert!(!WebContext::is_set());
    }

    #[test]
    fn guard_clears_during_unwind() {
        let result = std::panic::catch_unwind(|| {
            let _guard = WebContext::enter(&Request::new(Method::Post, "/explode"), &Response::new());
            panic!("handler blew up");
        });
        assert!(result.is_err());
        assert!(!WebContext::is_set());
    }
}
