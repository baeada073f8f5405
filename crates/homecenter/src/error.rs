//! Error taxonomy for the bridge.
//!
//! Setup-time errors ([`ConnectError`], [`DiscoveryError`], wrapped in
//! [`SetupError`]) abort an entry's setup. Everything else is isolated to a
//! single event or a single command.

use crate::controller::ComponentId;
use crate::controller::DeviceKind;
use crate::engine::StateError;

/// Connecting or authenticating against the hub failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectError {
    #[error("hub at {address} is unreachable: {reason}")]
    Unreachable { address: String, reason: String },

    #[error("hub rejected the credentials for user '{username}'")]
    Authentication { username: String },

    #[error("timed out connecting to {address}")]
    Timeout { address: String },
}

/// Component discovery failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DiscoveryError {
    #[error("controller is not connected")]
    NotConnected,

    #[error("components were awaited before being requested")]
    NotRequested,

    #[error("component discovery failed: {0}")]
    Failed(String),
}

/// A forwarded command did not complete.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("hub rejected the command: {0}")]
    Rejected(String),

    #[error("command timed out")]
    Timeout,

    #[error("channel for component {0} is gone")]
    ChannelGone(ComponentId),

    #[error("no entity with id '{0}'")]
    UnknownEntity(String),

    #[error("service '{service}' is not supported by {platform} entities")]
    Unsupported {
        platform: &'static str,
        service: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Setting up a config entry failed; nothing was registered.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("failed to connect: {0}")]
    Connect(#[from] ConnectError),

    #[error("failed to discover components: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("config entry '{0}' is already set up")]
    AlreadyLoaded(String),
}

/// A component id was registered twice in the same registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("component id {id} is already registered")]
pub struct DuplicateKey {
    pub id: ComponentId,
}

/// Registering an adapter failed; the adapter should be discarded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegisterError {
    #[error(transparent)]
    Duplicate(#[from] DuplicateKey),

    #[error("registry is closed; component {0} was not registered")]
    Invalidated(ComponentId),
}

/// An adapter could not be built for a discovered component.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("component {id} is a {expected} but its channel reports a {found} reading")]
pub struct AdapterError {
    pub id: ComponentId,
    pub expected: DeviceKind,
    pub found: DeviceKind,
}

/// Why a status-update event did not reach host state.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("component {0} is not registered")]
    UnknownComponent(ComponentId),

    #[error("no host state for {entity_id}")]
    MissingState { entity_id: String },

    #[error("invalid {kind} payload for component {id}: {reason}")]
    InvalidPayload {
        id: ComponentId,
        kind: DeviceKind,
        reason: String,
    },

    #[error("failed to publish state: {0}")]
    Publish(#[from] StateError),
}
