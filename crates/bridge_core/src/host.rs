//! Host capability surface consumed by the bridge

use crate::signal::SignalChannel;
use bridge_proto::{HostCommand, HostMethod, SignalName};
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;

/// A host call failed synchronously
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HostCallError(pub String);

/// An object exposed by the host runtime.
///
/// Commands are fire-and-forget: completion is reported later on the
/// object's signals. Methods with a direct answer return it from
/// [`HostObject::invoke`].
pub trait HostObject: Send + Sync {
    /// Registry id of this object
    fn object_id(&self) -> &str;

    /// Does the host expose `method` on this object?
    fn supports(&self, method: HostMethod) -> bool;

    /// Call a host method
    fn invoke(&self, command: &HostCommand) -> Result<Option<String>, HostCallError>;

    /// Channel for `name`, if this object has one
    fn signal(&self, name: SignalName) -> Option<Arc<SignalChannel>>;
}

/// Objects the host runtime exposes, by id
#[derive(Default)]
pub struct ObjectRegistry {
    objects: DashMap<String, Arc<dyn HostObject>>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `object` under its own id, replacing any previous one
    pub fn register(&self, object: Arc<dyn HostObject>) {
        let id = object.object_id().to_string();
        tracing::debug!(object = %id, "Host object registered");
        self.objects.insert(id, object);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn HostObject>> {
        self.objects.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.objects.contains_key(id)
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.objects.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl std::fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectRegistry").field("objects", &self.ids()).finish()
    }
}
