use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use strum::Display;
use strum::EnumIter;
use strum::EnumString;

use super::channel::Channel;
use super::event::EventKind;

/// Identifier the hub assigns to a component.
///
/// Stable for the component's lifetime and unique within one controller
/// session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub u32);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ComponentId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// The closed set of device kinds the bridge knows how to expose.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Light,
    Switch,
    BinarySensor,
    Cover,
    Thermostat,
}

impl DeviceKind {
    /// Host platform (entity domain) for this kind.
    pub fn platform(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Switch => "switch",
            Self::BinarySensor => "binary_sensor",
            Self::Cover => "cover",
            Self::Thermostat => "climate",
        }
    }

    /// Inverse of [`platform`](Self::platform).
    pub fn from_platform(platform: &str) -> Option<Self> {
        match platform {
            "light" => Some(Self::Light),
            "switch" => Some(Self::Switch),
            "binary_sensor" => Some(Self::BinarySensor),
            "cover" => Some(Self::Cover),
            "climate" => Some(Self::Thermostat),
            _ => None,
        }
    }

    /// The status-update event the hub emits for components of this kind.
    pub fn event_kind(self) -> EventKind {
        match self {
            Self::Light => EventKind::StatusUpdateLight,
            Self::Switch => EventKind::StatusUpdateSwitch,
            Self::BinarySensor => EventKind::StatusUpdateInput,
            Self::Cover => EventKind::StatusUpdateShade,
            Self::Thermostat => EventKind::StatusUpdateThermostat,
        }
    }
}

/// A unit the hub reports during discovery. Read-only; owned by the controller.
#[derive(Clone)]
pub struct Component {
    pub id: ComponentId,
    pub kind: DeviceKind,
    pub description: String,
    pub channel: Arc<dyn Channel>,
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("description", &self.description)
            .field("channel", &"<channel>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_platform_roundtrip() {
        for kind in DeviceKind::iter() {
            assert_eq!(DeviceKind::from_platform(kind.platform()), Some(kind));
        }
        assert_eq!(DeviceKind::from_platform("sensor"), None);
    }

    #[test]
    fn test_thermostat_is_climate_platform() {
        assert_eq!(DeviceKind::Thermostat.platform(), "climate");
        assert_eq!(DeviceKind::Thermostat.to_string(), "thermostat");
    }

    #[test]
    fn test_kind_parses_snake_case() {
        assert_eq!(
            DeviceKind::from_str("binary_sensor").unwrap(),
            DeviceKind::BinarySensor
        );
        assert!(DeviceKind::from_str("dimmer").is_err());
    }

    #[test]
    fn test_each_kind_has_distinct_event() {
        let events: std::collections::HashSet<_> =
            DeviceKind::iter().map(DeviceKind::event_kind).collect();
        assert_eq!(events.len(), 5);
        for kind in DeviceKind::iter() {
            assert_eq!(kind.event_kind().device_kind(), kind);
        }
    }
}
