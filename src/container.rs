//! Handler instance container.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::error::DispatchError;
use crate::route::{Target, TypeKey};

/// Supplies handler instances by type.
///
/// Implementations are expected to hand out a stable singleton per type: the
/// resolver caches the first instance on the route and never asks again.
pub trait Container: Send + Sync {
    /// Fails with [`DispatchError::Unbound`] when nothing is bound for `key`.
    fn instance(&self, key: &TypeKey) -> Result<Target, DispatchError>;
}

/// A type-keyed map of singletons.
#[derive(Clone, Default)]
pub struct Ioc {
    beans: Arc<RwLock<HashMap<TypeKey, Target>>>,
}

impl Ioc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `instance` as the singleton for `T`, replacing any previous one.
    pub fn register<T: Send + Sync + 'static>(&self, instance: T) -> &Self {
        let key = TypeKey::of::<T>();
        self.beans.write().insert(key, Arc::new(instance));
        debug!(bean = key.name(), "bean registered");
        self
    }

    /// Fetches the singleton for `T`, typed.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let target = self.beans.read().get(&TypeKey::of::<T>()).cloned()?;
        target.downcast::<T>().ok()
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.beans.read().contains_key(&TypeKey::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.beans.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Container for Ioc {
    fn instance(&self, key: &TypeKey) -> Result<Target, DispatchError> {
        trace!(bean = key.name(), "resolving bean");
        self.beans.read()
            .get(key)
            .cloned()
            .ok_or(DispatchError::Unbound(key.name()))
    }
}
