use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use super::registry::Registry;
use crate::controller::Component;
use crate::controller::ComponentId;
use crate::controller::DeviceKind;
use crate::controller::EventHandler;
use crate::controller::StatusUpdate;
use crate::engine::Entity;
use crate::engine::Host;
use crate::error::MirrorError;

/// Mirrors one device kind's status-update events into host state.
pub struct EventMirror {
    kind: DeviceKind,
    registry: Arc<Registry>,
    host: Arc<dyn Host>,
}

impl EventMirror {
    pub fn new(kind: DeviceKind, registry: Arc<Registry>, host: Arc<dyn Host>) -> Self {
        Self {
            kind,
            registry,
            host,
        }
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Resolve the adapter, merge the update into its cached status and
    /// publish the result over the entity's previous attributes. The cache
    /// only moves once the host has accepted the new state.
    pub fn process(&self, id: ComponentId, update: &StatusUpdate) -> Result<(), MirrorError> {
        let adapter = self
            .registry
            .lookup(id)
            .ok_or(MirrorError::UnknownComponent(id))?;

        let previous = self
            .host
            .get_state(adapter.entity_id())
            .ok_or_else(|| MirrorError::MissingState {
                entity_id: adapter.entity_id().to_string(),
            })?;

        let status = adapter.apply_update(update, |status| {
            let mut attributes = previous.attributes;
            attributes.extend(status.attributes());
            self.host
                .set_state(adapter.entity_id(), &status.state(), attributes)?;
            Ok(())
        })?;

        debug!("{} -> {}", adapter.entity_id(), status.state());
        Ok(())
    }
}

impl EventHandler for EventMirror {
    fn handle(&self, component: &Component, update: &StatusUpdate) {
        if let Err(e) = self.process(component.id, update) {
            warn!(
                "Dropped {} event for component {} ({}): {}",
                self.kind, component.id, component.description, e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::bridge::adapter::EntityAdapter;
    use crate::controller::ChannelReading;
    use crate::controller::mock::MockChannel;
    use crate::engine::Attributes;
    use crate::engine::HostState;
    use crate::engine::StateError;
    use crate::engine::StateStore;

    /// Serves reads from a real store but refuses every write.
    struct ReadOnlyHost(Arc<StateStore>);

    impl Host for ReadOnlyHost {
        fn add_entity(&self, entity: Arc<dyn Entity>) -> Result<(), StateError> {
            self.0.add_entity(entity)
        }

        fn get_state(&self, entity_id: &str) -> Option<HostState> {
            self.0.get_state(entity_id)
        }

        fn set_state(&self, entity_id: &str, _: &str, _: Attributes) -> Result<(), StateError> {
            Err(StateError::InvalidEntityId(entity_id.to_string()))
        }

        fn remove_entity(&self, entity_id: &str) -> bool {
            self.0.remove_entity(entity_id)
        }

        fn contains(&self, entity_id: &str) -> bool {
            self.0.contains(entity_id)
        }
    }

    fn setup(host: &Arc<StateStore>) -> (Arc<Registry>, EventMirror) {
        let component = Component {
            id: ComponentId(7),
            kind: DeviceKind::Light,
            description: "Kitchen".to_string(),
            channel: MockChannel::new(7, "Kitchen", ChannelReading::Dimmer { brightness: 0 }),
        };
        let adapter =
            Arc::new(EntityAdapter::new(component, "light.kitchen".to_string()).unwrap());
        let registry = Arc::new(Registry::new());
        registry.register(adapter.clone()).unwrap();
        host.add_entity(adapter).unwrap();

        let mirror = EventMirror::new(DeviceKind::Light, registry.clone(), host.clone());
        (registry, mirror)
    }

    #[test]
    fn test_process_publishes_merged_state() {
        let host = Arc::new(StateStore::new());
        let (_, mirror) = setup(&host);

        mirror
            .process(ComponentId(7), &StatusUpdate::Light { brightness: 100 })
            .unwrap();

        let state = host.get_state("light.kitchen").unwrap();
        assert_eq!(state.state, "on");
        assert_eq!(state.attributes["brightness"], json!(127));
        assert_eq!(state.attributes["friendly_name"], json!("Kitchen"));
    }

    #[test]
    fn test_untouched_attributes_survive() {
        let host = Arc::new(StateStore::new());
        let (_, mirror) = setup(&host);

        let mut attributes = host.get_state("light.kitchen").unwrap().attributes;
        attributes.insert("icon".into(), json!("mdi:lamp"));
        host.set_state("light.kitchen", "off", attributes).unwrap();

        mirror
            .process(ComponentId(7), &StatusUpdate::Light { brightness: 50 })
            .unwrap();

        let state = host.get_state("light.kitchen").unwrap();
        assert_eq!(state.attributes["icon"], json!("mdi:lamp"));
        assert_eq!(state.attributes["brightness"], json!(63));
    }

    #[test]
    fn test_unknown_component_is_reported() {
        let host = Arc::new(StateStore::new());
        let (registry, mirror) = setup(&host);

        let result = mirror.process(ComponentId(99), &StatusUpdate::Light { brightness: 1 });

        assert!(matches!(result, Err(MirrorError::UnknownComponent(ComponentId(99)))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_missing_state_skips_update() {
        let host = Arc::new(StateStore::new());
        let (registry, mirror) = setup(&host);
        host.remove_entity("light.kitchen");

        let result = mirror.process(ComponentId(7), &StatusUpdate::Light { brightness: 200 });

        assert!(matches!(result, Err(MirrorError::MissingState { .. })));
        assert!(host.get_state("light.kitchen").is_none());
        let adapter = registry.lookup(ComponentId(7)).unwrap();
        assert_eq!(adapter.state(), "off");
    }

    #[test]
    fn test_invalid_payload_keeps_previous_state() {
        let host = Arc::new(StateStore::new());
        let (_, mirror) = setup(&host);

        let result = mirror.process(ComponentId(7), &StatusUpdate::Light { brightness: 250 });

        assert!(matches!(result, Err(MirrorError::InvalidPayload { .. })));
        assert_eq!(host.get_state("light.kitchen").unwrap().state, "off");
    }

    #[test]
    fn test_events_after_invalidate_are_dropped() {
        let host = Arc::new(StateStore::new());
        let (registry, mirror) = setup(&host);
        registry.invalidate();

        let result = mirror.process(ComponentId(7), &StatusUpdate::Light { brightness: 200 });

        assert!(matches!(result, Err(MirrorError::UnknownComponent(_))));
        assert_eq!(host.get_state("light.kitchen").unwrap().state, "off");
    }

    #[test]
    fn test_rejected_publish_keeps_adapter_and_host_in_step() {
        let store = Arc::new(StateStore::new());
        let (registry, _) = setup(&store);
        let mirror = EventMirror::new(
            DeviceKind::Light,
            registry.clone(),
            Arc::new(ReadOnlyHost(store.clone())),
        );

        let result = mirror.process(ComponentId(7), &StatusUpdate::Light { brightness: 200 });

        assert!(matches!(result, Err(MirrorError::Publish(_))));
        let adapter = registry.lookup(ComponentId(7)).unwrap();
        assert_eq!(adapter.state(), "off");
        assert_eq!(store.get_state("light.kitchen").unwrap().state, "off");
    }
}
