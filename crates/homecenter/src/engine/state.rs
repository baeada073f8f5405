use std::collections::BTreeMap;
use std::sync::PoisonError;
use std::sync::RwLock;

use serde::Serialize;

use super::entity::DeviceInfo;
use super::entity::Entity;

/// Attribute mapping published alongside an entity's primary state.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// One entity's host-visible state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostState {
    pub entity_id: String,
    pub state: String,
    pub attributes: Attributes,
}

/// What the store remembers about a registered entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRegistration {
    pub entity_id: String,
    pub unique_id: String,
    pub name: String,
    pub platform: String,
    pub device: DeviceInfo,
    pub should_poll: bool,
}

impl EntityRegistration {
    pub fn of(entity: &dyn Entity) -> Self {
        Self {
            entity_id: entity.entity_id().to_string(),
            unique_id: entity.unique_id(),
            name: entity.name().to_string(),
            platform: entity.platform().to_string(),
            device: entity.device_info(),
            should_poll: entity.should_poll(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("'{0}' is not a valid entity id (expected domain.object_id)")]
    InvalidEntityId(String),

    #[error("entity '{0}' is already registered")]
    DuplicateEntity(String),
}

/// Check the `domain.object_id` shape: both halves non-empty and made of
/// lowercase ascii letters, digits and underscores.
pub(crate) fn validate_entity_id(entity_id: &str) -> Result<(), StateError> {
    let valid_part = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    };
    match entity_id.split_once('.') {
        Some((domain, object_id)) if valid_part(domain) && valid_part(object_id) => Ok(()),
        _ => Err(StateError::InvalidEntityId(entity_id.to_string())),
    }
}

/// In-memory host state store.
///
/// Readers take a snapshot; every write replaces one entity's state whole.
#[derive(Debug, Default)]
pub struct StateStore {
    states: RwLock<BTreeMap<String, HostState>>,
    registrations: RwLock<BTreeMap<String, EntityRegistration>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All current states, ordered by entity id.
    pub fn states(&self) -> Vec<HostState> {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn registration(&self, entity_id: &str) -> Option<EntityRegistration> {
        self.registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity_id)
            .cloned()
    }

    pub(crate) fn is_registered(&self, entity_id: &str) -> bool {
        self.registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(entity_id)
    }

    pub(crate) fn insert_registration(
        &self,
        registration: EntityRegistration,
    ) -> Result<(), StateError> {
        validate_entity_id(&registration.entity_id)?;
        let mut registrations = self
            .registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if registrations.contains_key(&registration.entity_id) {
            return Err(StateError::DuplicateEntity(registration.entity_id));
        }
        registrations.insert(registration.entity_id.clone(), registration);
        Ok(())
    }

    pub(crate) fn write_state(&self, state: HostState) -> Result<(), StateError> {
        validate_entity_id(&state.entity_id)?;
        self.states
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(state.entity_id.clone(), state);
        Ok(())
    }

    pub(crate) fn read_state(&self, entity_id: &str) -> Option<HostState> {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity_id)
            .cloned()
    }

    pub(crate) fn forget(&self, entity_id: &str) -> bool {
        let registered = self
            .registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(entity_id)
            .is_some();
        let had_state = self
            .states
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(entity_id)
            .is_some();
        registered || had_state
    }
}
