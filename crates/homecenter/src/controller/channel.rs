use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use strum::Display;
use strum::EnumString;

use super::component::ComponentId;
use super::component::DeviceKind;
use crate::error::CommandError;

/// Highest brightness a hub dimmer reports.
pub const DEVICE_MAX_BRIGHTNESS: u8 = 200;

/// Logical level of a hub input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum InputState {
    On,
    Off,
}

/// Motion state reported by a hub shade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ShadeState {
    Open,
    Closed,
    Opening,
    Closing,
    Stopped,
}

/// Operating mode of a hub thermostat.
///
/// Wider than the host's hvac vocabulary: `Manual` and `Eco` have no
/// host counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ThermostatMode {
    Off,
    Auto,
    Heat,
    Cool,
    Manual,
    Eco,
}

/// Everything a thermostat channel reports about itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermostatReading {
    pub current_temperature: Option<f64>,
    pub target_temperature: f64,
    pub current_preset: Option<String>,
    pub presets: Vec<String>,
    pub modes: Vec<ThermostatMode>,
    pub current_mode: ThermostatMode,
}

/// Kind-specific read properties of a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelReading {
    /// Brightness in device scale (0..=200)
    Dimmer { brightness: u8 },
    Toggle { on: bool },
    Input { state: InputState },
    Shade { state: ShadeState },
    Thermostat(ThermostatReading),
}

impl ChannelReading {
    /// The device kind this reading belongs to.
    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::Dimmer { .. } => DeviceKind::Light,
            Self::Toggle { .. } => DeviceKind::Switch,
            Self::Input { .. } => DeviceKind::BinarySensor,
            Self::Shade { .. } => DeviceKind::Cover,
            Self::Thermostat(_) => DeviceKind::Thermostat,
        }
    }
}

/// A command sent to the hub through a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelCommand {
    /// Device scale (0..=200); 0 switches the dimmer off
    SetBrightness(u8),
    /// Return to the last non-zero brightness
    RestoreBrightness,
    TurnOn,
    TurnOff,
    Open,
    Close,
    Stop,
    SetTargetTemperature(f64),
    SetPreset(String),
    SetMode(ThermostatMode),
}

/// The hub-side object through which one component is read and commanded.
#[async_trait]
pub trait Channel: Send + Sync {
    fn id(&self) -> ComponentId;

    fn name(&self) -> String;

    /// Current read properties. Never suspends.
    fn reading(&self) -> ChannelReading;

    /// Forward a command to the hub.
    async fn send(&self, command: ChannelCommand) -> Result<(), CommandError>;
}
