//! Session attribute storage.
//!
//! Only the contract lives here, with an in-memory implementation. Issuing
//! session ids and expiring sessions is left to whatever hook attaches the
//! session to the request.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

/// Attribute storage for one client session.
pub trait Session: Send + Sync {
    fn id(&self) -> &str;
    fn attribute(&self, name: &str) -> Option<Value>;
    fn set_attribute(&self, name: &str, value: Value);
    fn attributes(&self) -> HashMap<String, Value>;
    fn remove_attribute(&self, name: &str);
}

/// A [`Session`] backed by a locked map.
pub struct MemorySession {
    id: String,
    attributes: RwLock<HashMap<String, Value>>,
}

impl MemorySession {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), attributes: RwLock::new(HashMap::new()) }
    }
}

impl Session for MemorySession {
    fn id(&self) -> &str {
        &self.id
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes.read().get(name).cloned()
    }

    fn set_attribute(&self, name: &str, value: Value) {
        self.attributes.write().insert(name.to_owned(), value);
    }

    fn attributes(&self) -> HashMap<String, Value> {
        self.attributes.read().clone()
    }

    fn remove_attribute(&self, name: &str) {
        self.attributes.write().remove(name);
    }
}
