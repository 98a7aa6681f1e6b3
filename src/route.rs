//! Routes and hooks.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use crate::error::{DispatchError, HandlerResult};
use crate::handler::{ActionResult, HookResult, Interceptor, RouteHandler};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;

/// A container-managed handler instance.
pub type Target = Arc<dyn Any + Send + Sync>;

type MethodFn = Arc<dyn Fn(&Target, &mut Request, &mut Response) -> ActionResult + Send + Sync>;

/// Identifies the type a container hands out. Equality is by [`TypeId`]; the
/// name is carried for error messages.
#[derive(Clone, Copy, Debug)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: 'static>() -> Self {
        Self { id: TypeId::of::<T>(), name: std::any::type_name::<T>() }
    }

    pub fn id(&self) -> TypeId { self.id }
    pub fn name(&self) -> &'static str { self.name }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) { self.id.hash(state) }
}

/// How a route's target is invoked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetKind {
    /// The target implements [`RouteHandler`] and is called directly.
    Handler,
    /// The target is a plain value; a bound method is run through the
    /// [`Invoker`](crate::Invoker).
    Method,
}

enum Action {
    Handler(fn(&Target) -> Option<&dyn RouteHandler>),
    Method { name: &'static str, call: MethodFn },
}

fn as_handler<H: RouteHandler>(target: &Target) -> Option<&dyn RouteHandler> {
    (**target).downcast_ref::<H>().map(|h| h as &dyn RouteHandler)
}

// ── Route ─────────────────────────────────────────────────────────────────────

/// A method + path binding to an action on a lazily bound target.
///
/// The target cell is written at most once; see
/// [`HandlerResolver`](crate::HandlerResolver).
pub struct Route {
    method: Method,
    pattern: String,
    declaring: TypeKey,
    action: Action,
    target: OnceLock<Target>,
}

impl Route {
    /// A route whose target `H` is fetched from the container on first use.
    pub fn handler<H: RouteHandler>(method: Method, pattern: &str) -> Self {
        Self {
            method,
            pattern: pattern.to_owned(),
            declaring: TypeKey::of::<H>(),
            action: Action::Handler(as_handler::<H>),
            target: OnceLock::new(),
        }
    }

    /// A route bound to `instance` from the start.
    pub fn bound<H: RouteHandler>(method: Method, pattern: &str, instance: H) -> Self {
        let route = Self::handler::<H>(method, pattern);
        route.bind(Arc::new(instance));
        route
    }

    /// A declarative route: `call` runs against the container's `T`.
    pub fn action<T, F>(method: Method, pattern: &str, name: &'static str, call: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T, &mut Request, &mut Response) -> ActionResult + Send + Sync + 'static,
    {
        let call: MethodFn = Arc::new(move |target: &Target, req: &mut Request, res: &mut Response| {
            let this = (**target).downcast_ref::<T>()
                .ok_or(DispatchError::TargetMismatch(std::any::type_name::<T>()))?;
            call(this, req, res)
        });
        Self {
            method,
            pattern: pattern.to_owned(),
            declaring: TypeKey::of::<T>(),
            action: Action::Method { name, call },
            target: OnceLock::new(),
        }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn pattern(&self) -> &str { &self.pattern }
    pub fn declaring(&self) -> TypeKey { self.declaring }

    pub fn target_kind(&self) -> TargetKind {
        match self.action {
            Action::Handler(_) => TargetKind::Handler,
            Action::Method { .. } => TargetKind::Method,
        }
    }

    /// Name of the bound method for declarative routes.
    pub fn action_name(&self) -> Option<&'static str> {
        match self.action {
            Action::Method { name, .. } => Some(name),
            Action::Handler(_) => None,
        }
    }

    /// The cached target, if already bound.
    pub fn target(&self) -> Option<&Target> {
        self.target.get()
    }

    /// Caches `target` unless one is already bound, and returns the bound one.
    ///
    /// A concurrent loser's instance is dropped; both came from the same
    /// container binding, so either serves.
    pub(crate) fn bind(&self, target: Target) -> &Target {
        self.target.get_or_init(|| target)
    }

    /// Calls a [`TargetKind::Handler`] target.
    pub fn call_handler(&self, target: &Target, req: &mut Request, res: &mut Response) -> HandlerResult {
        let Action::Handler(cast) = self.action else {
            return Err(DispatchError::TargetMismatch("RouteHandler"));
        };
        cast(target)
            .ok_or(DispatchError::TargetMismatch(self.declaring.name))?
            .handle(req, res)
    }

    /// Runs the bound method of a [`TargetKind::Method`] target.
    pub fn call_action(&self, target: &Target, req: &mut Request, res: &mut Response) -> ActionResult {
        match &self.action {
            Action::Method { call, .. } => call(target, req, res),
            Action::Handler(_) => Err(DispatchError::TargetMismatch(self.declaring.name)),
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("declaring", &self.declaring.name)
            .field("kind", &self.target_kind())
            .field("bound", &self.target.get().is_some())
            .finish()
    }
}

// ── Hook ──────────────────────────────────────────────────────────────────────

/// Whether a hook runs before or after the route handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Before,
    After,
}

enum HookPattern {
    Any,
    Prefix(String),
    Tree(matchit::Router<()>),
}

impl HookPattern {
    fn parse(pattern: &str) -> Result<Self, matchit::InsertError> {
        if pattern == "*" || pattern == "/*" {
            return Ok(Self::Any);
        }
        if let Some(base) = pattern.strip_suffix("/*") {
            return Ok(Self::Prefix(base.to_owned()));
        }
        let mut tree = matchit::Router::new();
        tree.insert(pattern, ())?;
        Ok(Self::Tree(tree))
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Prefix(base) => path
                .strip_prefix(base.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
            Self::Tree(tree) => tree.at(path).is_ok(),
        }
    }
}

/// A path-matched interceptor, independent of HTTP method.
///
/// Patterns: `/*` matches everything, `/admin/*` matches `/admin` and
/// everything below it, anything else is a route pattern (`/users/{id}`).
pub struct Hook {
    pattern: String,
    matcher: HookPattern,
    priority: i32,
    phase: Phase,
    interceptor: Arc<dyn Interceptor>,
}

impl Hook {
    pub fn new(
        phase: Phase,
        pattern: &str,
        priority: i32,
        interceptor: impl Interceptor,
    ) -> Result<Self, matchit::InsertError> {
        Ok(Self {
            pattern: pattern.to_owned(),
            matcher: HookPattern::parse(pattern)?,
            priority,
            phase,
            interceptor: Arc::new(interceptor),
        })
    }

    pub fn pattern(&self) -> &str { &self.pattern }
    pub fn priority(&self) -> i32 { self.priority }
    pub fn phase(&self) -> Phase { self.phase }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }

    pub fn intercept(&self, req: &mut Request, res: &mut Response) -> Result<HookResult, DispatchError> {
        self.interceptor.intercept(req, res)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("phase", &self.phase)
            .field("pattern", &self.pattern)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Outcome;

    struct Ping;

    impl RouteHandler for Ping {
        fn handle(&self, _req: &mut Request, res: &mut Response) -> HandlerResult {
            res.text("pong");
            Ok(())
        }
    }

    struct Catalog {
        name: &'static str,
    }

    #[test]
    fn bind_keeps_the_first_target() {
        let route = Route::handler::<Ping>(Method::Get, "/ping");
        assert!(route.target().is_none());

        let first: Target = Arc::new(Ping);
        let second: Target = Arc::new(Ping);
        let bound = Arc::clone(route.bind(Arc::clone(&first)));
        route.bind(second);

        assert!(Arc::ptr_eq(&bound, &first));
        assert!(Arc::ptr_eq(route.target().unwrap(), &first));
    }

    #[test]
    fn handler_route_calls_through_downcast() {
        let route = Route::bound(Method::Get, "/ping", Ping);
        let target = Arc::clone(route.target().unwrap());
        let mut req = Request::new(Method::Get, "/ping");
        let mut res = Response::new();

        route.call_handler(&target, &mut req, &mut res).unwrap();
        assert_eq!(res.body_str(), "pong");
        assert_eq!(route.target_kind(), TargetKind::Handler);
    }

    #[test]
    fn wrong_target_type_is_a_mismatch() {
        let route = Route::handler::<Ping>(Method::Get, "/ping");
        let stranger: Target = Arc::new(42_u32);
        let err = route
            .call_handler(&stranger, &mut Request::new(Method::Get, "/ping"), &mut Response::new())
            .unwrap_err();
        assert!(matches!(err, DispatchError::TargetMismatch(_)));
    }

    #[test]
    fn action_route_reaches_the_target() {
        let route = Route::action::<Catalog, _>(Method::Get, "/catalog", "title", |c, _req, _res| {
            Ok(Outcome::Text(c.name.to_owned()))
        });
        let target: Target = Arc::new(Catalog { name: "spring" });

        assert_eq!(route.target_kind(), TargetKind::Method);
        assert_eq!(route.action_name(), Some("title"));
        let outcome = route
            .call_action(&target, &mut Request::new(Method::Get, "/catalog"), &mut Response::new())
            .unwrap();
        assert_eq!(outcome, Outcome::Text("spring".into()));
    }

    #[test]
    fn hook_patterns() {
        let noop = |_: &mut Request, _: &mut Response| Ok::<_, DispatchError>(HookResult::Continue);
        let any = Hook::new(Phase::Before, "/*", 0, noop).unwrap();
        let admin = Hook::new(Phase::Before, "/admin/*", 0, noop).unwrap();
        let user = Hook::new(Phase::After, "/users/{id}", 0, noop).unwrap();

        assert!(any.matches("/"));
        assert!(any.matches("/anything/at/all"));
        assert!(admin.matches("/admin"));
        assert!(admin.matches("/admin/panel"));
        assert!(!admin.matches("/administrator"));
        assert!(user.matches("/users/7"));
        assert!(!user.matches("/users"));
    }
}
