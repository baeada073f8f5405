use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use super::entity::Entity;
use super::state::Attributes;
use super::state::EntityRegistration;
use super::state::HostState;
use super::state::StateError;
use super::state::StateStore;

/// The host platform as the bridge sees it.
///
/// None of these calls suspend, so they are safe to make from an event
/// handler.
pub trait Host: Send + Sync {
    /// Register an entity and publish its initial state.
    fn add_entity(&self, entity: Arc<dyn Entity>) -> Result<(), StateError>;

    fn get_state(&self, entity_id: &str) -> Option<HostState>;

    /// Replace an entity's published state.
    fn set_state(
        &self,
        entity_id: &str,
        state: &str,
        attributes: Attributes,
    ) -> Result<(), StateError>;

    /// Drop an entity and its state. Returns false if it was unknown.
    fn remove_entity(&self, entity_id: &str) -> bool;

    /// Whether `entity_id` is already taken.
    fn contains(&self, entity_id: &str) -> bool;

    /// Register a batch of entities. Failures are logged and skipped; the
    /// number of entities added is returned.
    fn add_entities(&self, entities: Vec<Arc<dyn Entity>>) -> usize {
        let mut added = 0;
        for entity in entities {
            let entity_id = entity.entity_id().to_string();
            match self.add_entity(entity) {
                Ok(()) => added += 1,
                Err(e) => warn!("Failed to add entity {}: {}", entity_id, e),
            }
        }
        added
    }
}

impl Host for StateStore {
    fn add_entity(&self, entity: Arc<dyn Entity>) -> Result<(), StateError> {
        self.insert_registration(EntityRegistration::of(entity.as_ref()))?;
        let initial = HostState {
            entity_id: entity.entity_id().to_string(),
            state: entity.state(),
            attributes: entity.attributes(),
        };
        debug!("Added entity {} ({})", initial.entity_id, initial.state);
        self.write_state(initial)
    }

    fn get_state(&self, entity_id: &str) -> Option<HostState> {
        self.read_state(entity_id)
    }

    fn set_state(
        &self,
        entity_id: &str,
        state: &str,
        attributes: Attributes,
    ) -> Result<(), StateError> {
        self.write_state(HostState {
            entity_id: entity_id.to_string(),
            state: state.to_string(),
            attributes,
        })
    }

    fn remove_entity(&self, entity_id: &str) -> bool {
        self.forget(entity_id)
    }

    fn contains(&self, entity_id: &str) -> bool {
        self.is_registered(entity_id)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::engine::DeviceInfo;

    struct Fixed {
        entity_id: &'static str,
    }

    impl Entity for Fixed {
        fn entity_id(&self) -> &str {
            self.entity_id
        }

        fn unique_id(&self) -> String {
            format!("fixed-{}", self.entity_id)
        }

        fn name(&self) -> &str {
            "Fixed"
        }

        fn platform(&self) -> &'static str {
            "switch"
        }

        fn device_info(&self) -> DeviceInfo {
            DeviceInfo {
                manufacturer: "Test".to_string(),
                identifiers: vec![("test".to_string(), "1".to_string())],
                name: "Fixed".to_string(),
            }
        }

        fn state(&self) -> String {
            "off".to_string()
        }

        fn attributes(&self) -> Attributes {
            let mut attributes = Attributes::new();
            attributes.insert("friendly_name".into(), json!("Fixed"));
            attributes
        }
    }

    #[test]
    fn test_add_entity_publishes_initial_state() {
        let store = StateStore::new();
        store
            .add_entity(Arc::new(Fixed {
                entity_id: "switch.fixed",
            }))
            .unwrap();

        let state = store.get_state("switch.fixed").unwrap();
        assert_eq!(state.state, "off");
        assert_eq!(state.attributes["friendly_name"], json!("Fixed"));
        assert!(store.contains("switch.fixed"));
        assert!(!store.registration("switch.fixed").unwrap().should_poll);
    }

    #[test]
    fn test_add_entities_skips_duplicates() {
        let store = StateStore::new();
        let added = store.add_entities(vec![
            Arc::new(Fixed {
                entity_id: "switch.fixed",
            }),
            Arc::new(Fixed {
                entity_id: "switch.fixed",
            }),
            Arc::new(Fixed {
                entity_id: "bad id",
            }),
        ]);
        assert_eq!(added, 1);
        assert_eq!(store.states().len(), 1);
    }

    #[test]
    fn test_remove_entity() {
        let store = StateStore::new();
        store
            .add_entity(Arc::new(Fixed {
                entity_id: "switch.fixed",
            }))
            .unwrap();
        assert!(store.remove_entity("switch.fixed"));
        assert!(store.get_state("switch.fixed").is_none());
        assert!(!store.contains("switch.fixed"));
    }
}
