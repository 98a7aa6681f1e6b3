//! Before/after interceptor chains.

use std::sync::Arc;

use tracing::trace;

use crate::context::WebContext;
use crate::error::DispatchError;
use crate::invoker::Invoker;
use crate::request::Request;
use crate::response::Response;
use crate::router::RouteMatcher;

/// Runs the hook chains for a path.
#[derive(Clone)]
pub struct HookRunner {
    matcher: Arc<dyn RouteMatcher>,
    invoker: Arc<dyn Invoker>,
}

impl HookRunner {
    pub fn new(matcher: Arc<dyn RouteMatcher>, invoker: Arc<dyn Invoker>) -> Self {
        Self { matcher, invoker }
    }

    /// Runs every before-hook for `path` and returns how many asked to stop.
    /// The request-scoped context is refreshed after each hook.
    ///
    /// A stop signal never skips the hooks after it; only the route is
    /// skipped, and only once all of them have run. An error does end the
    /// chain.
    pub fn run_before(&self, req: &mut Request, res: &mut Response, path: &str) -> Result<usize, DispatchError> {
        let hooks = self.matcher.before_hooks(path);
        trace!(path, count = hooks.len(), "before hooks");
        hooks.iter().try_fold(0, |interrupts, hook| {
            let proceed = self.invoker.invoke_hook(req, res, hook)?;
            WebContext::sync(req, res);
            Ok(interrupts + usize::from(!proceed))
        })
    }

    /// Runs every after-hook for `path`. Their signals are ignored.
    pub fn run_after(&self, req: &mut Request, res: &mut Response, path: &str) -> Result<(), DispatchError> {
        let hooks = self.matcher.after_hooks(path);
        trace!(path, count = hooks.len(), "after hooks");
        for hook in &hooks {
            self.invoker.invoke_hook(req, res, hook)?;
            WebContext::sync(req, res);
        }
        Ok(())
    }
}
