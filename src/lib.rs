//! # skiff
//!
//! A small synchronous-handler HTTP framework on hyper, with a lifecycle
//! event bus.
//!
//! ## The request pipeline
//!
//! Every request takes the same path through the [`Dispatcher`]:
//!
//! - **Static check**: paths under a configured static prefix go straight to
//!   the [`StaticFiles`] collaborator. No hooks, no routing, no context.
//! - **Before-hooks**: all of them run, in priority order. Any hook may
//!   return [`HookResult::Stop`] to skip the route handler; the rest still run.
//! - **Routing**: radix-tree lookup via [`matchit`]. A miss is a 404.
//! - **Binding**: a route names a handler *type*. The first request fetches
//!   the instance from the [`Container`] and caches it on the route.
//! - **After-hooks**: run once the handler returns, in priority order.
//!
//! Failures never escape: a [`DomainError`] is rendered with its message,
//! anything else (including a panic) becomes a bare 500, and the connection
//! is closed either way.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use skiff::{Application, Config, EventType, HandlerResult, HookResult, Ioc,
//!             Method, Request, Response, RouteHandler, Router, Server};
//!
//! struct Users;
//!
//! impl RouteHandler for Users {
//!     fn handle(&self, req: &mut Request, res: &mut Response) -> HandlerResult {
//!         res.text(format!("user {}", req.param("id").unwrap_or("?")));
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), skiff::Error> {
//!     let config = Config::default();
//!     skiff::logging::init(&config.log);
//!
//!     let ioc = Ioc::new();
//!     ioc.register(Users);
//!
//!     let router = Router::new()
//!         .on::<Users>(Method::Get, "/users/{id}")
//!         .get("/", |_req, res| { res.text("hello"); Ok(()) })
//!         .before("/*", 0, |req, _res| {
//!             tracing::info!(path = req.path(), "incoming");
//!             Ok(HookResult::Continue)
//!         });
//!
//!     let app = Application::new(router)
//!         .with_config(config.clone())
//!         .with_container(ioc)
//!         .on(EventType::ServerStarted, |_: &skiff::Event| -> Result<(), skiff::BoxError> {
//!             tracing::info!("ready");
//!             Ok(())
//!         });
//!
//!     Server::from_config(&config)?.serve(app).await
//! }
//! ```

mod app;
mod classifier;
mod config;
mod container;
mod context;
mod dispatcher;
mod error;
mod event;
mod handler;
mod hooks;
mod invoker;
mod method;
mod request;
mod resolver;
mod response;
mod route;
mod router;
mod server;
mod session;
mod statics;
mod ui;

pub mod logging;

/// Value of the `Server` header on every response.
pub const SERVER_NAME: &str = concat!("skiff/", env!("CARGO_PKG_VERSION"));

pub use app::Application;
pub use classifier::StaticPrefixes;
pub use config::{Config, DispatchMode, LogConfig, ServerConfig, StaticsConfig};
pub use container::{Container, Ioc};
pub use context::WebContext;
pub use dispatcher::Dispatcher;
pub use error::{BoxError, DispatchError, DomainError, Error, EventError, HandlerResult};
pub use event::{Event, EventListener, EventManager, EventType};
pub use handler::{ActionResult, FnHandler, HookResult, Interceptor, Outcome, RouteHandler};
pub use hooks::HookRunner;
pub use invoker::{ActionInvoker, Invoker};
pub use method::{Method, UnknownMethod};
pub use request::Request;
pub use resolver::HandlerResolver;
pub use response::{ContentType, Response};
pub use route::{Hook, Phase, Route, Target, TargetKind, TypeKey};
pub use router::{RouteMatch, RouteMatcher, Router};
pub use server::Server;
pub use session::{MemorySession, Session};
pub use statics::{StaticFileHandler, StaticFiles};
