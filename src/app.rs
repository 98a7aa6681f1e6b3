//! Application assembly.

use std::sync::Arc;

use crate::config::Config;
use crate::container::{Container, Ioc};
use crate::error::EventError;
use crate::event::{EventListener, EventManager, EventType};
use crate::invoker::{ActionInvoker, Invoker};
use crate::router::RouteMatcher;
use crate::statics::{StaticFileHandler, StaticFiles};

/// Everything a dispatch needs, wired once at startup.
///
/// ```rust
/// use skiff::{Application, Config, EventType, Ioc, Router};
///
/// let app = Application::new(Router::new().get("/", |_req, res| { res.text("hi"); Ok(()) }))
///     .with_config(Config::default())
///     .with_container(Ioc::new());
/// app.events().register(EventType::ServerStarted, |_: &skiff::Event| -> Result<(), skiff::BoxError> { Ok(()) });
/// ```
pub struct Application {
    config: Config,
    matcher: Arc<dyn RouteMatcher>,
    container: Arc<dyn Container>,
    invoker: Arc<dyn Invoker>,
    static_files: Option<Arc<dyn StaticFiles>>,
    events: EventManager,
}

impl Application {
    pub fn new(matcher: impl RouteMatcher + 'static) -> Self {
        Self {
            config: Config::default(),
            matcher: Arc::new(matcher),
            container: Arc::new(Ioc::new()),
            invoker: Arc::new(ActionInvoker),
            static_files: None,
            events: EventManager::new(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_container(mut self, container: impl Container + 'static) -> Self {
        self.container = Arc::new(container);
        self
    }

    pub fn with_invoker(mut self, invoker: impl Invoker + 'static) -> Self {
        self.invoker = Arc::new(invoker);
        self
    }

    /// Replaces the default file server rooted at `statics.root`.
    pub fn with_static_files(mut self, files: impl StaticFiles + 'static) -> Self {
        self.static_files = Some(Arc::new(files));
        self
    }

    /// Registers a lifecycle listener; chaining form of
    /// [`EventManager::register`].
    pub fn on(self, kind: EventType, listener: impl EventListener) -> Self {
        self.events.register(kind, listener);
        self
    }

    pub fn config(&self) -> &Config { &self.config }
    pub fn events(&self) -> &EventManager { &self.events }
    pub fn matcher(&self) -> &Arc<dyn RouteMatcher> { &self.matcher }
    pub fn container(&self) -> &Arc<dyn Container> { &self.container }
    pub fn invoker(&self) -> &Arc<dyn Invoker> { &self.invoker }

    pub fn static_handler(&self) -> Arc<dyn StaticFiles> {
        match &self.static_files {
            Some(files) => Arc::clone(files),
            None => {
                let statics = &self.config.statics;
                let files = StaticFileHandler::new(statics.root.clone());
                Arc::new(match statics.max_age {
                    Some(secs) => files.with_max_age(secs),
                    None => files,
                })
            }
        }
    }

    /// Fires `kind` with this application as payload.
    pub fn fire(self: &Arc<Self>, kind: EventType) -> Result<(), EventError> {
        self.events.fire(kind, Some(Arc::clone(self)))
    }
}
