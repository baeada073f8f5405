use std::sync::Arc;

use strum::IntoEnumIterator;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::adapter::Command;
use super::adapter::EntityAdapter;
use super::entity_id::EntityIdAllocator;
use super::mirror::EventMirror;
use super::registry::Registry;
use crate::controller::Controller;
use crate::controller::Credentials;
use crate::controller::DeviceKind;
use crate::engine::Entity;
use crate::engine::Host;
use crate::error::CommandError;
use crate::error::DiscoveryError;
use crate::error::SetupError;

/// One set-up config entry: a hub connection and the entities built from it.
///
/// Owns the controller exclusively. [`unload`](Self::unload) closes it
/// exactly once.
pub struct HomecenterIntegration {
    entry_id: String,
    controller: Box<dyn Controller>,
    registry: Arc<Registry>,
    host: Arc<dyn Host>,
}

impl HomecenterIntegration {
    /// Connect, discover, and expose every discovered component.
    ///
    /// A connect or discovery failure aborts setup before anything is
    /// registered with the host.
    pub async fn setup(
        entry_id: impl Into<String>,
        credentials: &Credentials,
        mut controller: Box<dyn Controller>,
        host: Arc<dyn Host>,
    ) -> Result<Self, SetupError> {
        let entry_id = entry_id.into();
        info!("Setting up entry '{}' ({})", entry_id, credentials.address);

        if let Err(e) = controller.connect(credentials).await {
            error!("Entry '{}': connect failed: {}", entry_id, e);
            return Err(e.into());
        }

        if let Err(e) = Self::discover(controller.as_mut()).await {
            error!("Entry '{}': discovery failed: {}", entry_id, e);
            controller.close().await;
            return Err(e.into());
        }

        let registry = Arc::new(Registry::new());
        let mut allocator = EntityIdAllocator::new();

        for kind in DeviceKind::iter() {
            let mut entities: Vec<Arc<dyn Entity>> = Vec::new();

            for component in controller.get_all(kind) {
                let entity_id = allocator.allocate(
                    kind.platform(),
                    component.id,
                    &component.description,
                    |id| host.contains(id),
                );
                let description = component.description.clone();

                let adapter = match EntityAdapter::new(component, entity_id) {
                    Ok(adapter) => Arc::new(adapter),
                    Err(e) => {
                        warn!("Skipping '{}': {}", description, e);
                        continue;
                    }
                };

                if let Err(e) = registry.register(adapter.clone()) {
                    warn!("Discarding '{}': {}", description, e);
                    continue;
                }
                entities.push(adapter);
            }

            let count = host.add_entities(entities);
            debug!("Entry '{}': added {} {} entities", entry_id, count, kind.platform());

            let mirror = EventMirror::new(kind, registry.clone(), host.clone());
            controller.on(kind.event_kind(), Arc::new(mirror));
        }

        info!(
            "Entry '{}' set up with {} components",
            entry_id,
            registry.len()
        );

        Ok(Self {
            entry_id,
            controller,
            registry,
            host,
        })
    }

    async fn discover(controller: &mut dyn Controller) -> Result<(), DiscoveryError> {
        controller.request_components().await?;
        controller.await_components().await
    }

    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Whether `entity_id` belongs to this entry.
    pub fn owns(&self, entity_id: &str) -> bool {
        self.registry.find_by_entity_id(entity_id).is_some()
    }

    /// Forward a command to the entity with `entity_id`.
    pub async fn apply_command(&self, entity_id: &str, command: Command) -> Result<(), CommandError> {
        let adapter = self
            .registry
            .find_by_entity_id(entity_id)
            .ok_or_else(|| CommandError::UnknownEntity(entity_id.to_string()))?;
        adapter.apply_command(command).await
    }

    /// Tear the entry down: empty the registry, close the hub connection,
    /// then drop the entities from the host.
    pub async fn unload(mut self) {
        let adapters = self.registry.invalidate();
        self.controller.close().await;
        for adapter in &adapters {
            self.host.remove_entity(adapter.entity_id());
        }
        info!(
            "Unloaded entry '{}' ({} entities removed)",
            self.entry_id,
            adapters.len()
        );
    }
}
