use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use strum::Display;
use strum::EnumIter;
use tracing::debug;
use tracing::warn;

use super::channel::InputState;
use super::channel::ShadeState;
use super::channel::ThermostatMode;
use super::component::Component;
use super::component::DeviceKind;

/// Events a hub emits. One status-update event per device kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    StatusUpdateLight,
    StatusUpdateSwitch,
    StatusUpdateInput,
    StatusUpdateShade,
    StatusUpdateThermostat,
}

impl EventKind {
    pub fn device_kind(self) -> DeviceKind {
        match self {
            Self::StatusUpdateLight => DeviceKind::Light,
            Self::StatusUpdateSwitch => DeviceKind::Switch,
            Self::StatusUpdateInput => DeviceKind::BinarySensor,
            Self::StatusUpdateShade => DeviceKind::Cover,
            Self::StatusUpdateThermostat => DeviceKind::Thermostat,
        }
    }
}

/// Payload of a status-update event, as the hub reports it.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    /// Device-scale brightness (0..=200)
    Light { brightness: u8 },

    /// Raw toggle value; anything above zero means on
    Switch { value: i64 },

    Input { state: InputState },

    Shade {
        previous: ShadeState,
        current: ShadeState,
    },

    Thermostat {
        current_temperature: f64,
        preset: String,
        target_temperature: f64,
        mode: ThermostatMode,
    },
}

impl StatusUpdate {
    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::Light { .. } => DeviceKind::Light,
            Self::Switch { .. } => DeviceKind::Switch,
            Self::Input { .. } => DeviceKind::BinarySensor,
            Self::Shade { .. } => DeviceKind::Cover,
            Self::Thermostat { .. } => DeviceKind::Thermostat,
        }
    }

    pub fn event_kind(&self) -> EventKind {
        self.kind().event_kind()
    }
}

/// Receives status updates from a controller.
///
/// Called on the controller's dispatch loop, so implementations must not
/// block or await.
pub trait EventHandler: Send + Sync {
    fn handle(&self, component: &Component, update: &StatusUpdate);
}

/// Handler table a controller keeps for [`Controller::on`](super::Controller::on).
///
/// Cheap to clone; clones share the same table.
#[derive(Clone, Default)]
pub struct EventHandlers {
    handlers: Arc<Mutex<HashMap<EventKind, Arc<dyn EventHandler>>>>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`, replacing any earlier registration.
    pub fn register(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        let mut handlers = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if handlers.insert(kind, handler).is_some() {
            warn!("Replaced existing handler for {}", kind);
        }
    }

    /// Deliver an update to the handler registered for its event kind.
    ///
    /// Returns false when nobody is listening.
    pub fn dispatch(&self, component: &Component, update: &StatusUpdate) -> bool {
        let kind = update.event_kind();
        // Release the table before calling out so handlers may register.
        let handler = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned();

        match handler {
            Some(handler) => {
                handler.handle(component, update);
                true
            }
            None => {
                debug!("No handler for {} (component {})", kind, component.id);
                false
            }
        }
    }

    pub fn clear(&self) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
