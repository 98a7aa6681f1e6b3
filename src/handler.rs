//! Handler and interceptor traits.
//!
//! # How handlers are stored
//!
//! A route does not hold its handler directly. It holds the *type* that
//! declares the handler and a cell for an instance of that type, which the
//! resolver fills on first use from the [`Container`](crate::Container):
//!
//! ```text
//! Router::new().on::<Users>(Method::Get, "/users")   ← registration: type only
//!        ↓ first request
//! container.instance(TypeKey::of::<Users>())         ← Arc<dyn Any + Send + Sync>
//!        ↓ cached on the route
//! target.downcast_ref::<Users>()                      ← typed again
//!        ↓
//! <Users as RouteHandler>::handle(&mut req, &mut res)
//! ```
//!
//! Plain closures skip the container: they are wrapped in [`FnHandler`] and
//! bound at registration time.

use serde_json::Value;

use crate::error::{DispatchError, HandlerResult};
use crate::request::Request;
use crate::response::Response;

// ── Route handlers ────────────────────────────────────────────────────────────

/// A target that handles a request itself.
///
/// Implement it on a type registered in the container, then route to the type
/// with [`Router::on`](crate::Router::on).
pub trait RouteHandler: Send + Sync + 'static {
    fn handle(&self, req: &mut Request, res: &mut Response) -> HandlerResult;
}

/// Wraps a closure so it can serve as a pre-bound route target.
pub struct FnHandler<F>(pub(crate) F);

impl<F> RouteHandler for FnHandler<F>
where
    F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
{
    fn handle(&self, req: &mut Request, res: &mut Response) -> HandlerResult {
        (self.0)(req, res)
    }
}

/// What a declarative action produced. Rendered by the
/// [`Invoker`](crate::Invoker).
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The action wrote the response itself.
    Written,
    Text(String),
    Html(String),
    Json(Value),
    Redirect(String),
}

/// Return type of declarative actions.
pub type ActionResult = Result<Outcome, DispatchError>;

// ── Hooks ─────────────────────────────────────────────────────────────────────

/// Result of one interceptor invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookResult {
    /// Keep going.
    Continue,
    /// Skip the route handler. Remaining before-hooks still run.
    Stop,
}

/// A path-matched interceptor run before or after the route handler.
///
/// Implemented for any `Fn(&mut Request, &mut Response) -> Result<HookResult, DispatchError>`.
pub trait Interceptor: Send + Sync + 'static {
    fn intercept(&self, req: &mut Request, res: &mut Response) -> Result<HookResult, DispatchError>;
}

impl<F> Interceptor for F
where
    F: Fn(&mut Request, &mut Response) -> Result<HookResult, DispatchError> + Send + Sync + 'static,
{
    fn intercept(&self, req: &mut Request, res: &mut Response) -> Result<HookResult, DispatchError> {
        self(req, res)
    }
}
