//! Lifecycle event bus.
//!
//! A fixed set of [`EventType`]s, each with its own list of listeners. Firing
//! an event calls the listeners synchronously, lowest priority first, on the
//! caller's thread. The first listener that fails stops the fire and its error
//! goes back to the caller.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::app::Application;
use crate::error::{BoxError, EventError};

/// The lifecycle events an application emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    ServerStarting,
    ServerStarted,
    ServerStopping,
    ServerStopped,
    SessionCreated,
    SessionDestroyed,
}

impl EventType {
    pub const ALL: [EventType; 6] = [
        Self::ServerStarting,
        Self::ServerStarted,
        Self::ServerStopping,
        Self::ServerStopped,
        Self::SessionCreated,
        Self::SessionDestroyed,
    ];

    const fn slot(self) -> usize {
        self as usize
    }
}

/// One notification. Listeners must treat the application as optional.
#[derive(Clone)]
pub struct Event {
    kind: EventType,
    app: Option<Arc<Application>>,
}

impl Event {
    pub fn new(kind: EventType, app: Option<Arc<Application>>) -> Self {
        Self { kind, app }
    }

    pub fn kind(&self) -> EventType { self.kind }
    pub fn app(&self) -> Option<&Arc<Application>> { self.app.as_ref() }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind)
            .field("has_app", &self.app.is_some())
            .finish()
    }
}

/// Receives lifecycle events.
///
/// Implemented for any `Fn(&Event) -> Result<(), BoxError>`.
pub trait EventListener: Send + Sync + 'static {
    fn on_event(&self, event: &Event) -> Result<(), BoxError>;

    /// Ordering among listeners of the same type; lower runs first.
    fn priority(&self) -> i32 {
        0
    }
}

impl<F> EventListener for F
where
    F: Fn(&Event) -> Result<(), BoxError> + Send + Sync + 'static,
{
    fn on_event(&self, event: &Event) -> Result<(), BoxError> {
        self(event)
    }
}

struct Entry {
    priority: i32,
    listener: Arc<dyn EventListener>,
}

/// Listener registry keyed by [`EventType`].
///
/// Seeded with one list per event type at construction, so registering or
/// firing can never hit an unknown type.
pub struct EventManager {
    listeners: RwLock<[Vec<Entry>; EventType::ALL.len()]>,
}

impl EventManager {
    pub fn new() -> Self {
        Self { listeners: RwLock::new(std::array::from_fn(|_| Vec::new())) }
    }

    /// Appends `listener` at its own [`priority`](EventListener::priority).
    /// The same listener may be registered more than once.
    pub fn register(&self, kind: EventType, listener: impl EventListener) {
        let priority = listener.priority();
        self.register_with_priority(kind, priority, listener);
    }

    pub fn register_with_priority(&self, kind: EventType, priority: i32, listener: impl EventListener) {
        self.listeners.write()[kind.slot()].push(Entry { priority, listener: Arc::new(listener) });
    }

    pub fn listener_count(&self, kind: EventType) -> usize {
        self.listeners.read()[kind.slot()].len()
    }

    /// Notifies every listener of `kind`, lowest priority first; equal
    /// priorities run in registration order.
    ///
    /// The registry lock is released before the first listener runs, so a
    /// listener may register further listeners; they apply from the next fire.
    pub fn fire(&self, kind: EventType, app: Option<Arc<Application>>) -> Result<(), EventError> {
        let mut ordered: Vec<(i32, Arc<dyn EventListener>)> = self.listeners.read()[kind.slot()]
            .iter()
            .map(|e| (e.priority, Arc::clone(&e.listener)))
            .collect();
        ordered.sort_by_key(|(priority, _)| *priority);

        trace!(event = ?kind, listeners = ordered.len(), "firing");
        for (_, listener) in ordered {
            listener
                .on_event(&Event::new(kind, app.clone()))
                .map_err(|source| EventError { event: kind, source })?;
        }
        Ok(())
    }

    /// Fires `kind` without an application payload.
    pub fn fire_bare(&self, kind: EventType) -> Result<(), EventError> {
        self.fire(kind, None)
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}
