//! Lazy handler binding.

use std::sync::Arc;

use tracing::debug;

use crate::container::Container;
use crate::error::DispatchError;
use crate::route::{Route, Target};

/// Binds routes to container-managed targets on first use.
///
/// No lock is held while the container is asked for an instance. Two
/// requests racing on the same unbound route may both fetch one; the route
/// keeps whichever lands first and both callers get that one.
#[derive(Clone)]
pub struct HandlerResolver {
    container: Arc<dyn Container>,
}

impl HandlerResolver {
    pub fn new(container: Arc<dyn Container>) -> Self {
        Self { container }
    }

    pub fn resolve(&self, route: &Route) -> Result<Target, DispatchError> {
        if let Some(target) = route.target() {
            return Ok(Arc::clone(target));
        }
        let instance = self.container.instance(&route.declaring())?;
        debug!(route = route.pattern(), target = route.declaring().name(), "route bound");
        Ok(Arc::clone(route.bind(instance)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::route::TypeKey;
    use crate::{HandlerResult, Method, Request, Response, RouteHandler};

    struct Greeter;

    impl RouteHandler for Greeter {
        fn handle(&self, _req: &mut Request, res: &mut Response) -> HandlerResult {
            res.text("hi");
            Ok(())
        }
    }

    /// Hands out a fresh instance every call and counts them.
    #[derive(Default)]
    struct Factory {
        calls: AtomicUsize,
    }

    impl Container for Factory {
        fn instance(&self, _key: &TypeKey) -> Result<Target, DispatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Greeter))
        }
    }

    #[test]
    fn resolves_once_then_reuses() {
        let factory = Arc::new(Factory::default());
        let resolver = HandlerResolver::new(factory.clone());
        let route = Route::handler::<Greeter>(Method::Get, "/greet");

        let first = resolver.resolve(&route).unwrap();
        let second = resolver.resolve(&route).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_first_resolution_converges() {
        let factory = Arc::new(Factory::default());
        let resolver = HandlerResolver::new(factory);
        let route = Arc::new(Route::handler::<Greeter>(Method::Get, "/greet"));

        let targets: Vec<Target> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| resolver.resolve(&route).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let bound = route.target().unwrap();
        assert!(targets.iter().all(|t| Arc::ptr_eq(t, bound)));
    }

    #[test]
    fn missing_binding_propagates() {
        let resolver = HandlerResolver::new(Arc::new(crate::Ioc::new()));
        let route = Route::handler::<Greeter>(Method::Get, "/greet");
        assert!(matches!(resolver.resolve(&route), Err(DispatchError::Unbound(_))));
        assert!(route.target().is_none());
    }
}
