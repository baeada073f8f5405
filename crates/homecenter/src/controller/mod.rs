//! Boundary with the hub controller.
//!
//! The hub protocol itself lives behind [`Controller`] and [`Channel`]. The
//! bridge only relies on the lifecycle below:
//!
//! 1. [`connect`](Controller::connect)
//! 2. [`request_components`](Controller::request_components), then
//!    [`await_components`](Controller::await_components)
//! 3. [`get_all`](Controller::get_all) per device kind
//! 4. [`on`](Controller::on) per status-update event
//! 5. [`close`](Controller::close), exactly once

mod channel;
mod component;
mod event;
#[cfg(test)]
pub(crate) mod mock;
mod virtual_hub;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
pub use channel::Channel;
pub use channel::ChannelCommand;
pub use channel::ChannelReading;
pub use channel::DEVICE_MAX_BRIGHTNESS;
pub use channel::InputState;
pub use channel::ShadeState;
pub use channel::ThermostatMode;
pub use channel::ThermostatReading;
pub use component::Component;
pub use component::ComponentId;
pub use component::DeviceKind;
pub use event::EventHandler;
pub use event::EventHandlers;
pub use event::EventKind;
pub use event::StatusUpdate;
pub use virtual_hub::ComponentSpec;
pub use virtual_hub::VirtualHomecenter;

use crate::error::ConnectError;
use crate::error::DiscoveryError;

/// Credentials for one hub.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// `host:port`
    pub address: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            address: address.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("address", &self.address)
            .finish()
    }
}

/// A connection to one hub.
#[async_trait]
pub trait Controller: Send + Sync {
    async fn connect(&mut self, credentials: &Credentials) -> Result<(), ConnectError>;

    /// Ask the hub to start reporting its components.
    async fn request_components(&mut self) -> Result<(), DiscoveryError>;

    /// Wait until the hub has reported every component.
    async fn await_components(&mut self) -> Result<(), DiscoveryError>;

    /// Discovered components of one kind.
    fn get_all(&self, kind: DeviceKind) -> Vec<Component>;

    /// Register the handler for one event kind.
    fn on(&mut self, event: EventKind, handler: Arc<dyn EventHandler>);

    /// Release the connection. Events stop being delivered.
    async fn close(&mut self);
}
