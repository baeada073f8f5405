use serde::Serialize;

use super::state::Attributes;

/// Device registry information attached to every entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub manufacturer: String,
    /// `(domain, id)` pairs identifying the physical device
    pub identifiers: Vec<(String, String)>,
    pub name: String,
}

/// Base trait that all entities must implement
pub trait Entity: Send + Sync {
    /// `platform.object_id`, e.g. `light.kitchen`
    fn entity_id(&self) -> &str;

    /// Stable across restarts, unlike the entity id.
    fn unique_id(&self) -> String;

    fn name(&self) -> &str;

    /// Return the platform type of this entity (e.g. "light", "cover")
    fn platform(&self) -> &'static str;

    fn device_info(&self) -> DeviceInfo;

    /// Push-only entities never need polling.
    fn should_poll(&self) -> bool {
        false
    }

    /// Primary state value, e.g. "on" or "opening".
    fn state(&self) -> String;

    fn attributes(&self) -> Attributes;
}
