//! Route and hook matching.
//!
//! One radix tree per HTTP method for routes. Hooks are kept in two flat
//! lists, one per phase, ordered by priority; every hook whose pattern
//! matches the path applies.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::error::{DispatchError, HandlerResult};
use crate::handler::{ActionResult, FnHandler, HookResult, Interceptor, RouteHandler};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::route::{Hook, Phase, Route};

/// A matched route with the path parameters it captured.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    pub params: HashMap<String, String>,
}

/// Resolves a method + path into a route, and a path into its hooks.
pub trait RouteMatcher: Send + Sync {
    fn lookup_route(&self, method: Method, path: &str) -> Option<RouteMatch>;

    /// Before-hooks matching `path`, in execution order.
    fn before_hooks(&self, path: &str) -> Vec<Arc<Hook>>;

    /// After-hooks matching `path`, in execution order.
    fn after_hooks(&self, path: &str) -> Vec<Arc<Hook>>;
}

/// The application router.
///
/// Build it once at startup; hand it to [`Application::new`](crate::Application::new).
/// Every registration method returns `self` so registrations chain:
///
/// ```rust
/// use skiff::{HookResult, Method, Router};
///
/// struct Users;
/// # impl skiff::RouteHandler for Users {
/// #     fn handle(&self, _: &mut skiff::Request, _: &mut skiff::Response) -> skiff::HandlerResult { Ok(()) }
/// # }
///
/// let router = Router::new()
///     .on::<Users>(Method::Get, "/users")
///     .get("/health", |_req, res| { res.text("ok"); Ok(()) })
///     .before("/*", 0, |_req, _res| Ok(HookResult::Continue));
/// ```
///
/// # Panics
///
/// Registration panics on a pattern matchit rejects, or on a second route for
/// the same method and pattern. Both are startup bugs.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Arc<Route>>>,
    before: Vec<Arc<Hook>>,
    after: Vec<Arc<Hook>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), before: Vec::new(), after: Vec::new() }
    }

    /// Routes to `H`, an instance of which the container supplies on first use.
    pub fn on<H: RouteHandler>(self, method: Method, path: &str) -> Self {
        self.route(Route::handler::<H>(method, path))
    }

    /// Routes to a method on a container-managed `T`. The method's
    /// [`Outcome`](crate::Outcome) is rendered by the invoker.
    pub fn action<T, F>(self, method: Method, path: &str, name: &'static str, call: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T, &mut Request, &mut Response) -> ActionResult + Send + Sync + 'static,
    {
        self.route(Route::action::<T, F>(method, path, name, call))
    }

    /// Routes to a closure, bound immediately.
    pub fn handle<F>(self, method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Route::bound(method, path, FnHandler(handler)))
    }

    pub fn get<F>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.handle(Method::Get, path, handler)
    }

    pub fn post<F>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.handle(Method::Post, path, handler)
    }

    pub fn put<F>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.handle(Method::Put, path, handler)
    }

    pub fn delete<F>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.handle(Method::Delete, path, handler)
    }

    /// Registers a before-hook. Lower `priority` runs first.
    pub fn before<I>(self, pattern: &str, priority: i32, interceptor: I) -> Self
    where
        I: Fn(&mut Request, &mut Response) -> Result<HookResult, DispatchError> + Send + Sync + 'static,
    {
        self.hook(Phase::Before, pattern, priority, interceptor)
    }

    /// Registers an after-hook. Lower `priority` runs first.
    pub fn after<I>(self, pattern: &str, priority: i32, interceptor: I) -> Self
    where
        I: Fn(&mut Request, &mut Response) -> Result<HookResult, DispatchError> + Send + Sync + 'static,
    {
        self.hook(Phase::After, pattern, priority, interceptor)
    }

    /// Registers any [`Interceptor`] for `phase`.
    pub fn hook(mut self, phase: Phase, pattern: &str, priority: i32, interceptor: impl Interceptor) -> Self {
        let hook = Hook::new(phase, pattern, priority, interceptor)
            .unwrap_or_else(|e| panic!("invalid hook pattern `{pattern}`: {e}"));
        let list = match phase {
            Phase::Before => &mut self.before,
            Phase::After => &mut self.after,
        };
        list.push(Arc::new(hook));
        // Stable: equal priorities keep registration order.
        list.sort_by_key(|h| h.priority());
        self
    }

    /// Adds a prepared [`Route`].
    pub fn route(mut self, route: Route) -> Self {
        let pattern = route.pattern().to_owned();
        self.routes
            .entry(route.method())
            .or_default()
            .insert(pattern.as_str(), Arc::new(route))
            .unwrap_or_else(|e| panic!("invalid route `{pattern}`: {e}"));
        self
    }

    fn hooks_for(hooks: &[Arc<Hook>], path: &str) -> Vec<Arc<Hook>> {
        hooks.iter().filter(|h| h.matches(path)).cloned().collect()
    }
}

impl RouteMatcher for Router {
    fn lookup_route(&self, method: Method, path: &str) -> Option<RouteMatch> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some(RouteMatch { route: Arc::clone(matched.value), params })
    }

    fn before_hooks(&self, path: &str) -> Vec<Arc<Hook>> {
        Self::hooks_for(&self.before, path)
    }

    fn after_hooks(&self, path: &str) -> Vec<Arc<Hook>> {
        Self::hooks_for(&self.after, path)
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
