//! Invocation of declarative actions and hooks.

use crate::error::{DispatchError, HandlerResult};
use crate::handler::{HookResult, Outcome};
use crate::request::Request;
use crate::response::Response;
use crate::route::{Hook, Route, Target};

/// Runs a declarative route's action and renders its outcome, and runs hooks.
///
/// This is the seam where argument binding and view rendering plug in.
pub trait Invoker: Send + Sync {
    fn invoke(&self, req: &mut Request, res: &mut Response, route: &Route, target: &Target) -> HandlerResult;

    /// `true` lets dispatch continue, `false` asks it to skip the route.
    fn invoke_hook(&self, req: &mut Request, res: &mut Response, hook: &Hook) -> Result<bool, DispatchError>;
}

/// Calls the route's bound method and writes its [`Outcome`] into the
/// response. JSON is rendered with `serde_json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ActionInvoker;

impl ActionInvoker {
    fn render(outcome: Outcome, res: &mut Response) -> HandlerResult {
        match outcome {
            Outcome::Written => {}
            Outcome::Text(body) => { res.text(body); }
            Outcome::Html(body) => { res.html(body); }
            Outcome::Json(value) => { res.json(serde_json::to_vec(&value)?); }
            Outcome::Redirect(location) => { res.redirect(&location); }
        }
        Ok(())
    }
}

impl Invoker for ActionInvoker {
    fn invoke(&self, req: &mut Request, res: &mut Response, route: &Route, target: &Target) -> HandlerResult {
        let outcome = route.call_action(target, req, res)?;
        Self::render(outcome, res)
    }

    fn invoke_hook(&self, req: &mut Request, res: &mut Response, hook: &Hook) -> Result<bool, DispatchError> {
        Ok(hook.intercept(req, res)? == HookResult::Continue)
    }
}
