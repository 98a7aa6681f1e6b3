//! Minimal skiff example: container-bound handlers, a declarative action,
//! hooks and lifecycle listeners.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:9000/users/42
//!   curl http://localhost:9000/books/7
//!   curl http://localhost:9000/admin            ← stopped by a before-hook
//!   curl http://localhost:9000/fail             ← domain error page
//!   curl http://localhost:9000/static/app.css   ← served from ./resources

use std::sync::Arc;

use serde_json::json;
use skiff::{
    Application, BoxError, Config, DomainError, Event, EventType, HandlerResult, HookResult, Ioc,
    MemorySession, Method, Outcome, Request, Response, RouteHandler, Router, Server, WebContext,
};
use http::StatusCode;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), skiff::Error> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    skiff::logging::init(&config.log);

    let ioc = Ioc::new();
    ioc.register(Users { greeting: "hello" });
    ioc.register(Books);

    let router = Router::new()
        .on::<Users>(Method::Get, "/users/{id}")
        .action(Method::Get, "/books/{id}", "show", Books::show)
        .get("/fail", |_req, _res| Err(DomainError::new("the shelf is empty").into()))
        .get("/admin", |_req, res| {
            res.text("welcome, admin");
            Ok(())
        })
        .before("/*", 0, |req: &mut Request, _res: &mut Response| {
            if req.session().is_none() {
                req.set_session(Arc::new(MemorySession::new(format!("{:?}", req.peer()))));
            }
            Ok(HookResult::Continue)
        })
        .before("/admin", 10, |_req: &mut Request, res: &mut Response| {
            res.status(StatusCode::FORBIDDEN).text("admins only");
            Ok(HookResult::Stop)
        })
        .after("/*", 0, |req: &mut Request, res: &mut Response| {
            info!(path = req.path(), status = %res.status_code(), "served");
            Ok(HookResult::Continue)
        });

    let app = Application::new(router)
        .with_config(config.clone())
        .with_container(ioc)
        .on(EventType::ServerStarted, |_: &Event| -> Result<(), BoxError> {
            info!("ready for traffic");
            Ok(())
        })
        .on(EventType::ServerStopped, |_: &Event| -> Result<(), BoxError> {
            info!("bye");
            Ok(())
        });

    Server::from_config(&config)?.serve(app).await
}

// GET /users/{id}, bound lazily from the container.
struct Users {
    greeting: &'static str,
}

impl RouteHandler for Users {
    fn handle(&self, req: &mut Request, res: &mut Response) -> HandlerResult {
        let id = req.param("id").unwrap_or("unknown");
        let peer = WebContext::with(|current| current.and_then(Request::peer));
        res.text(format!("{} user {id} (from {peer:?})", self.greeting));
        Ok(())
    }
}

// GET /books/{id}, rendered as JSON by the invoker.
struct Books;

impl Books {
    fn show(&self, req: &mut Request, _res: &mut Response) -> skiff::ActionResult {
        let id = req.param("id").unwrap_or("0");
        Ok(Outcome::Json(json!({ "id": id, "title": "Dune" })))
    }
}
