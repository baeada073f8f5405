//! Host side of the bridge: the entity contract and the state store that
//! entities publish into.

mod entity;
mod host;
mod state;

pub use entity::DeviceInfo;
pub use entity::Entity;
pub use host::Host;
pub use state::Attributes;
pub use state::EntityRegistration;
pub use state::HostState;
pub use state::StateError;
pub use state::StateStore;
