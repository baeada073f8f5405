use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use super::adapter::EntityAdapter;
use crate::controller::ComponentId;
use crate::engine::Entity;
use crate::error::DuplicateKey;
use crate::error::RegisterError;

#[derive(Debug, Default)]
struct Inner {
    adapters: HashMap<ComponentId, Arc<EntityAdapter>>,
    /// Set once the owning entry has been unloaded
    invalidated: bool,
}

/// Maps component ids to their adapters for one config entry.
///
/// Built once during setup and read on every event. [`invalidate`] empties
/// it in one step at unload, so late events find nothing.
///
/// [`invalidate`]: Registry::invalidate
#[derive(Debug, Default)]
pub struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its component id.
    ///
    /// The first registration wins; a duplicate is rejected and the caller
    /// should discard it. Nothing can be registered once invalidated.
    pub fn register(&self, adapter: Arc<EntityAdapter>) -> Result<(), RegisterError> {
        let id = adapter.component_id();
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.invalidated {
            return Err(RegisterError::Invalidated(id));
        }
        if inner.adapters.contains_key(&id) {
            return Err(DuplicateKey { id }.into());
        }
        inner.adapters.insert(id, adapter);
        Ok(())
    }

    pub fn lookup(&self, id: ComponentId) -> Option<Arc<EntityAdapter>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .adapters
            .get(&id)
            .cloned()
    }

    /// Every adapter, ordered by component id.
    pub fn all(&self) -> Vec<Arc<EntityAdapter>> {
        let mut adapters: Vec<_> = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .adapters
            .values()
            .cloned()
            .collect();
        adapters.sort_by_key(|a| a.component_id());
        adapters
    }

    pub fn find_by_entity_id(&self, entity_id: &str) -> Option<Arc<EntityAdapter>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .adapters
            .values()
            .find(|a| a.entity_id() == entity_id)
            .cloned()
    }

    /// Drop every adapter, returning them. Lookups fail from here on.
    pub fn invalidate(&self) -> Vec<Arc<EntityAdapter>> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.invalidated = true;
        let mut adapters: Vec<_> = inner.adapters.drain().map(|(_, a)| a).collect();
        adapters.sort_by_key(|a| a.component_id());
        adapters
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .adapters
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
