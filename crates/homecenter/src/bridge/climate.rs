use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use strum::Display;
use strum::EnumIter;
use strum::EnumString;
use tracing::warn;

use super::adapter::Command;
use crate::controller::ChannelCommand;
use crate::controller::ComponentId;
use crate::controller::DeviceKind;
use crate::controller::ThermostatMode;
use crate::controller::ThermostatReading;
use crate::engine::Attributes;
use crate::error::MirrorError;

/// Climate entity feature flags.
pub const SUPPORT_TARGET_TEMPERATURE: u32 = 1;
pub const SUPPORT_PRESET_MODE: u32 = 16;

pub const TEMPERATURE_UNIT: &str = "°C";

/// The host's fixed hvac vocabulary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum HvacMode {
    Off,
    Auto,
    Heat,
    Cool,
}

impl HvacMode {
    /// Map a thermostat mode onto the host vocabulary.
    ///
    /// Modes without a host counterpart fall back to heat.
    pub fn from_device(mode: ThermostatMode) -> Self {
        match mode {
            ThermostatMode::Off => Self::Off,
            ThermostatMode::Auto => Self::Auto,
            ThermostatMode::Heat => Self::Heat,
            ThermostatMode::Cool => Self::Cool,
            other => {
                warn!("Thermostat mode {} has no hvac equivalent, using heat", other);
                Self::Heat
            }
        }
    }

    pub fn to_device(self) -> ThermostatMode {
        match self {
            Self::Off => ThermostatMode::Off,
            Self::Auto => ThermostatMode::Auto,
            Self::Heat => ThermostatMode::Heat,
            Self::Cool => ThermostatMode::Cool,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClimateStatus {
    pub current_temperature: Option<f64>,
    pub target_temperature: f64,
    pub preset: Option<String>,
    pub presets: Vec<String>,
    pub hvac_mode: HvacMode,
    /// Only the device modes that have a host counterpart
    pub hvac_modes: Vec<HvacMode>,
}

impl ClimateStatus {
    pub fn from_reading(reading: &ThermostatReading) -> Self {
        let mut hvac_modes = Vec::new();
        for mode in [
            ThermostatMode::Off,
            ThermostatMode::Auto,
            ThermostatMode::Heat,
            ThermostatMode::Cool,
        ] {
            if reading.modes.contains(&mode) {
                hvac_modes.push(HvacMode::from_device(mode));
            }
        }

        Self {
            current_temperature: reading.current_temperature,
            target_temperature: reading.target_temperature,
            preset: reading.current_preset.clone(),
            presets: reading.presets.clone(),
            hvac_mode: HvacMode::from_device(reading.current_mode),
            hvac_modes,
        }
    }

    /// Merge a status-update into this status. Preset and mode lists are
    /// not part of the event and carry over.
    pub fn apply_update(
        &self,
        id: ComponentId,
        current_temperature: f64,
        preset: &str,
        target_temperature: f64,
        mode: ThermostatMode,
    ) -> Result<Self, MirrorError> {
        for (field, value) in [
            ("current temperature", current_temperature),
            ("target temperature", target_temperature),
        ] {
            if !value.is_finite() {
                return Err(MirrorError::InvalidPayload {
                    id,
                    kind: DeviceKind::Thermostat,
                    reason: format!("{} is {}", field, value),
                });
            }
        }

        Ok(Self {
            current_temperature: Some(current_temperature),
            target_temperature,
            preset: (!preset.is_empty()).then(|| preset.to_string()),
            presets: self.presets.clone(),
            hvac_mode: HvacMode::from_device(mode),
            hvac_modes: self.hvac_modes.clone(),
        })
    }

    pub fn state(&self) -> &'static str {
        if self.hvac_mode == HvacMode::Off {
            "off"
        } else {
            "on"
        }
    }

    pub fn attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("current_temperature".into(), json!(self.current_temperature));
        attributes.insert("temperature".into(), json!(self.target_temperature));
        attributes.insert("preset_mode".into(), json!(self.preset));
        attributes.insert("preset_modes".into(), json!(self.presets));
        attributes.insert("hvac_mode".into(), json!(self.hvac_mode));
        attributes.insert("hvac_modes".into(), json!(self.hvac_modes));
        attributes.insert("temperature_unit".into(), json!(TEMPERATURE_UNIT));
        attributes.insert(
            "supported_features".into(),
            json!(SUPPORT_TARGET_TEMPERATURE | SUPPORT_PRESET_MODE),
        );
        attributes
    }
}

pub fn channel_command(command: &Command) -> Option<ChannelCommand> {
    match command {
        Command::SetTemperature(temperature) => {
            Some(ChannelCommand::SetTargetTemperature(*temperature))
        }
        Command::SetPresetMode(preset) => Some(ChannelCommand::SetPreset(preset.clone())),
        Command::SetHvacMode(mode) => Some(ChannelCommand::SetMode(mode.to_device())),
        _ => None,
    }
}
