//! Per-request dispatch.
//!
//! ```text
//! request ─▶ classify ─┬─ static ─▶ StaticFiles::serve ─────────────────────────┐
//!                      └─ dynamic ─▶ publish context ─▶ before-hooks             │
//!                                     ├─ any stop ─▶ (route skipped) ─────────────┤
//!                                     └─ none ─▶ lookup ─┬─ miss ─▶ 404           │
//!                                                        └─ hit ─▶ resolve ─▶     │
//!                                                           invoke ─▶ after-hooks ┤
//!                                    context cleared (guard drop) ◀──────────────┘
//! any error or panic ─▶ rendered 500, connection closed
//! ```
//!
//! Everything runs synchronously on the calling thread. Nothing here awaits,
//! times out or retries; a handler that never returns holds its thread.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use http::StatusCode;
use tracing::{debug, error};

use crate::app::Application;
use crate::classifier::StaticPrefixes;
use crate::context::WebContext;
use crate::error::DispatchError;
use crate::hooks::HookRunner;
use crate::invoker::Invoker;
use crate::request::Request;
use crate::resolver::HandlerResolver;
use crate::response::{ContentType, Response};
use crate::route::TargetKind;
use crate::router::RouteMatcher;
use crate::statics::StaticFiles;
use crate::{ui, SERVER_NAME};

enum Flow {
    Done,
    NotFound,
}

/// Owns the lifecycle of one request.
pub struct Dispatcher {
    statics: StaticPrefixes,
    static_files: Arc<dyn StaticFiles>,
    matcher: Arc<dyn RouteMatcher>,
    hooks: HookRunner,
    resolver: HandlerResolver,
    invoker: Arc<dyn Invoker>,
    show_error_details: bool,
}

impl Dispatcher {
    pub fn new(app: &Application) -> Self {
        let config = app.config();
        Self {
            statics: StaticPrefixes::new(config.statics.prefixes.iter().cloned()),
            static_files: app.static_handler(),
            matcher: Arc::clone(app.matcher()),
            hooks: HookRunner::new(Arc::clone(app.matcher()), Arc::clone(app.invoker())),
            resolver: HandlerResolver::new(Arc::clone(app.container())),
            invoker: Arc::clone(app.invoker()),
            show_error_details: config.server.show_error_details,
        }
    }

    /// Serves one request. Never fails: errors come back as rendered
    /// responses with [`Response::is_close`] set.
    pub fn dispatch(&self, mut req: Request) -> Response {
        let mut res = Response::new();
        res.header("server", SERVER_NAME);
        debug!(method = %req.method(), path = req.path(), "dispatch");

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run(&mut req, &mut res)))
            .unwrap_or_else(|payload| Err(DispatchError::Panic(panic_message(payload))));

        match result {
            Ok(Flow::Done) => res,
            Ok(Flow::NotFound) => {
                debug!(method = %req.method(), path = req.path(), "no route");
                error_response(Response::with_body(
                    StatusCode::NOT_FOUND,
                    ContentType::Html,
                    ui::not_found(req.path()),
                ))
            }
            Err(err) => self.render_failure(res.content_type(), err),
        }
    }

    fn run(&self, req: &mut Request, res: &mut Response) -> Result<Flow, DispatchError> {
        let path = req.path().to_owned();

        if self.statics.is_static(&path) {
            self.static_files.serve(req, res, &path)?;
            return Ok(Flow::Done);
        }

        let _context = WebContext::enter(req, res);

        let interrupts = self.hooks.run_before(req, res, &path)?;
        if interrupts > 0 {
            debug!(path = %path, interrupts, "route skipped by before-hooks");
            return Ok(Flow::Done);
        }

        let Some(matched) = self.matcher.lookup_route(req.method(), &path) else {
            return Ok(Flow::NotFound);
        };
        req.set_params(matched.params);
        WebContext::sync(req, res);
        let route = matched.route;

        let target = self.resolver.resolve(&route)?;
        match route.target_kind() {
            TargetKind::Handler => route.call_handler(&target, req, res)?,
            TargetKind::Method => self.invoker.invoke(req, res, &route, &target)?,
        }
        WebContext::sync(req, res);

        self.hooks.run_after(req, res, &path)?;
        Ok(Flow::Done)
    }

    /// Domain failures show their message, and on HTML responses the full
    /// diagnostic page unless `show_error_details` is off. Everything else is
    /// a bare 500.
    fn render_failure(&self, negotiated: &str, err: DispatchError) -> Response {
        let res = match err {
            DispatchError::Domain(e) => {
                error!(kind = e.type_name(), message = e.message(), "domain failure");
                if self.show_error_details && negotiated.contains("html") {
                    Response::with_body(StatusCode::INTERNAL_SERVER_ERROR, ContentType::Html, ui::domain_error(&e))
                } else {
                    Response::with_body(StatusCode::INTERNAL_SERVER_ERROR, ContentType::Text, e.message())
                }
            }
            other => {
                error!(error = %other, "dispatch failed");
                generic_failure()
            }
        };
        error_response(res)
    }
}

/// A detail-free `Failure: <status>` response that closes the connection.
pub(crate) fn failure_response(status: StatusCode) -> Response {
    error_response(Response::with_body(status, ContentType::Text, ui::failure(status)))
}

/// The 500 used for unclassified and transport failures.
pub(crate) fn generic_failure() -> Response {
    failure_response(StatusCode::INTERNAL_SERVER_ERROR)
}

fn error_response(mut res: Response) -> Response {
    res.header("server", SERVER_NAME).close();
    res
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload.downcast_ref::<&str>().map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DomainError, HandlerResult, HookResult, Ioc, Method, Router, RouteHandler};

    struct Missing;

    impl RouteHandler for Missing {
        fn handle(&self, _req: &mut Request, _res: &mut Response) -> HandlerResult {
            Ok(())
        }
    }

    fn dispatcher(router: Router) -> Dispatcher {
        Dispatcher::new(&Application::new(router).with_container(Ioc::new()))
    }

    #[test]
    fn route_params_reach_the_handler() {
        let d = dispatcher(Router::new().get("/users/{id}", |req, res| {
            res.text(format!("user {}", req.param("id").unwrap_or("?")));
            Ok(())
        }));
        let res = d.dispatch(Request::new(Method::Get, "/users/42"));
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body_str(), "user 42");
        assert_eq!(res.get_header("server"), Some(SERVER_NAME));
        assert!(!res.is_close());
    }

    #[test]
    fn unbound_target_is_a_generic_500() {
        let d = dispatcher(Router::new().on::<Missing>(Method::Get, "/missing"));
        let res = d.dispatch(Request::new(Method::Get, "/missing"));
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body_str(), "Failure: 500 Internal Server Error\r\n");
        assert!(res.is_close());
    }

    #[test]
    fn panicking_handler_is_contained() {
        let d = dispatcher(Router::new().get("/boom", |_req, _res| panic!("kaboom")));
        let res = d.dispatch(Request::new(Method::Get, "/boom"));
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(res.is_close());
        assert!(!WebContext::is_set());
    }

    #[test]
    fn hook_domain_error_is_rendered_with_detail() {
        let d = dispatcher(
            Router::new()
                .before("/*", 0, |_req, _res| Err(DomainError::new("not logged in").into()))
                .get("/", |_req, _res| Ok(())),
        );
        let res = d.dispatch(Request::new(Method::Get, "/"));
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(res.body_str().contains("not logged in"));
    }

    #[test]
    fn details_can_be_switched_off() {
        let mut config = crate::Config::default();
        config.server.show_error_details = false;
        let app = Application::new(
            Router::new().get("/", |_req, _res| Err(DomainError::new("quota exceeded").into())),
        )
        .with_config(config);
        let res = Dispatcher::new(&app).dispatch(Request::new(Method::Get, "/"));
        assert_eq!(res.body_str(), "quota exceeded");
        assert_eq!(res.content_type(), ContentType::Text.as_str());
    }

    #[test]
    fn stop_skips_route_but_keeps_hook_output() {
        let d = dispatcher(
            Router::new()
                .before("/*", 0, |_req, res| {
                    res.status(StatusCode::UNAUTHORIZED).text("login first");
                    Ok(HookResult::Stop)
                })
                .get("/", |_req, res| { res.text("secret"); Ok(()) }),
        );
        let res = d.dispatch(Request::new(Method::Get, "/"));
        assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.body_str(), "login first");
    }
}
