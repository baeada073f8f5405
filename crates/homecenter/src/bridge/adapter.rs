use std::str::FromStr;
use std::sync::Mutex;
use std::sync::PoisonError;

use serde_json::Value;
use serde_json::json;

use super::climate;
use super::climate::ClimateStatus;
use super::climate::HvacMode;
use super::cover;
use super::cover::CoverState;
use super::cover::CoverStatus;
use super::light;
use super::light::LightStatus;
use super::switch;
use super::switch::OnOffStatus;
use crate::controller::ChannelReading;
use crate::controller::Component;
use crate::controller::ComponentId;
use crate::controller::DeviceKind;
use crate::controller::StatusUpdate;
use crate::engine::Attributes;
use crate::engine::DeviceInfo;
use crate::engine::Entity;
use crate::error::AdapterError;
use crate::error::CommandError;
use crate::error::MirrorError;

pub const MANUFACTURER: &str = "Homecenter";

/// A command issued against an entity, in host terms.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Brightness is on the host scale; absent means restore the previous level.
    TurnOn { brightness: Option<u8> },
    TurnOff,
    OpenCover,
    CloseCover,
    StopCover,
    SetTemperature(f64),
    SetPresetMode(String),
    SetHvacMode(HvacMode),
}

impl Command {
    /// The host service this command corresponds to.
    pub fn service(&self) -> &'static str {
        match self {
            Self::TurnOn { .. } => "turn_on",
            Self::TurnOff => "turn_off",
            Self::OpenCover => "open_cover",
            Self::CloseCover => "close_cover",
            Self::StopCover => "stop_cover",
            Self::SetTemperature(_) => "set_temperature",
            Self::SetPresetMode(_) => "set_preset_mode",
            Self::SetHvacMode(_) => "set_hvac_mode",
        }
    }

    /// Parse a host service call for an entity of `kind`.
    ///
    /// Returns `Ok(None)` for calls that are accepted but do nothing, such as
    /// `set_temperature` without a temperature.
    pub fn from_service(
        kind: DeviceKind,
        service: &str,
        data: &Value,
    ) -> Result<Option<Self>, CommandError> {
        let command = match (kind, service) {
            (DeviceKind::Light, "turn_on") => Self::TurnOn {
                brightness: optional_brightness(data)?,
            },
            (DeviceKind::Light | DeviceKind::Switch, "turn_off") => Self::TurnOff,
            (DeviceKind::Switch, "turn_on") => Self::TurnOn { brightness: None },
            (DeviceKind::Cover, "open_cover") => Self::OpenCover,
            (DeviceKind::Cover, "close_cover") => Self::CloseCover,
            (DeviceKind::Cover, "stop_cover") => Self::StopCover,
            (DeviceKind::Thermostat, "set_temperature") => match data.get("temperature") {
                None | Some(Value::Null) => return Ok(None),
                Some(value) => Self::SetTemperature(finite_number(value, "temperature")?),
            },
            (DeviceKind::Thermostat, "set_preset_mode") => {
                Self::SetPresetMode(required_str(data, "preset_mode")?.to_string())
            }
            (DeviceKind::Thermostat, "set_hvac_mode") => {
                let mode = required_str(data, "hvac_mode")?;
                Self::SetHvacMode(HvacMode::from_str(mode).map_err(|_| {
                    CommandError::InvalidArgument(format!("unknown hvac_mode '{}'", mode))
                })?)
            }
            _ => {
                return Err(CommandError::Unsupported {
                    platform: kind.platform(),
                    service: service.to_string(),
                });
            }
        };
        Ok(Some(command))
    }
}

fn optional_brightness(data: &Value) -> Result<Option<u8>, CommandError> {
    match data.get("brightness") {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|b| u8::try_from(b).ok())
            .map(Some)
            .ok_or_else(|| {
                CommandError::InvalidArgument(format!(
                    "brightness must be an integer in 0..=255, got {}",
                    value
                ))
            }),
    }
}

fn finite_number(value: &Value, field: &str) -> Result<f64, CommandError> {
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CommandError::InvalidArgument(format!("{} must be a number", field)))
}

fn required_str<'a>(data: &'a Value, field: &str) -> Result<&'a str, CommandError> {
    data.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| CommandError::InvalidArgument(format!("missing {}", field)))
}

/// Cached status of one adapter, one variant per device kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Light(LightStatus),
    Switch(OnOffStatus),
    BinarySensor(OnOffStatus),
    Cover(CoverStatus),
    Climate(ClimateStatus),
}

impl Status {
    fn from_reading(reading: &ChannelReading) -> Self {
        match reading {
            ChannelReading::Dimmer { brightness } => {
                Self::Light(LightStatus::from_device(*brightness))
            }
            ChannelReading::Toggle { on } => Self::Switch(OnOffStatus { on: *on }),
            ChannelReading::Input { state } => {
                Self::BinarySensor(OnOffStatus::from_input(*state))
            }
            ChannelReading::Shade { state } => Self::Cover(CoverStatus {
                state: CoverState::from_reading(*state),
            }),
            ChannelReading::Thermostat(reading) => {
                Self::Climate(ClimateStatus::from_reading(reading))
            }
        }
    }

    /// Validate an event payload and merge it into this status.
    fn merge(&self, id: ComponentId, update: &StatusUpdate) -> Result<Self, MirrorError> {
        match (self, update) {
            (Self::Light(_), StatusUpdate::Light { brightness }) => {
                LightStatus::apply_update(id, *brightness).map(Self::Light)
            }
            (Self::Switch(_), StatusUpdate::Switch { value }) => {
                Ok(Self::Switch(OnOffStatus::from_value(*value)))
            }
            (Self::BinarySensor(_), StatusUpdate::Input { state }) => {
                Ok(Self::BinarySensor(OnOffStatus::from_input(*state)))
            }
            (Self::Cover(_), StatusUpdate::Shade { previous, current }) => {
                Ok(Self::Cover(CoverStatus {
                    state: CoverState::from_transition(*previous, *current),
                }))
            }
            (
                Self::Climate(status),
                StatusUpdate::Thermostat {
                    current_temperature,
                    preset,
                    target_temperature,
                    mode,
                },
            ) => status
                .apply_update(id, *current_temperature, preset, *target_temperature, *mode)
                .map(Self::Climate),
            (status, update) => Err(MirrorError::InvalidPayload {
                id,
                kind: status.kind(),
                reason: format!("unexpected {} event", update.kind()),
            }),
        }
    }

    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::Light(_) => DeviceKind::Light,
            Self::Switch(_) => DeviceKind::Switch,
            Self::BinarySensor(_) => DeviceKind::BinarySensor,
            Self::Cover(_) => DeviceKind::Cover,
            Self::Climate(_) => DeviceKind::Thermostat,
        }
    }

    pub fn state(&self) -> String {
        match self {
            Self::Light(status) => status.state().to_string(),
            Self::Switch(status) | Self::BinarySensor(status) => status.state().to_string(),
            Self::Cover(status) => status.state(),
            Self::Climate(status) => status.state().to_string(),
        }
    }

    pub fn attributes(&self) -> Attributes {
        match self {
            Self::Light(status) => status.attributes(),
            Self::Switch(status) | Self::BinarySensor(status) => status.attributes(),
            Self::Cover(status) => status.attributes(),
            Self::Climate(status) => status.attributes(),
        }
    }
}

/// Wraps one discovered component as a host entity.
///
/// Holds the component's channel for commands and a cached status that only
/// status-update events change.
#[derive(Debug)]
pub struct EntityAdapter {
    component: Component,
    entity_id: String,
    /// Channel name at construction time
    name: String,
    status: Mutex<Status>,
}

impl EntityAdapter {
    pub fn new(component: Component, entity_id: String) -> Result<Self, AdapterError> {
        let reading = component.channel.reading();
        if reading.kind() != component.kind {
            return Err(AdapterError {
                id: component.id,
                expected: component.kind,
                found: reading.kind(),
            });
        }

        Ok(Self {
            status: Mutex::new(Status::from_reading(&reading)),
            name: component.channel.name(),
            component,
            entity_id,
        })
    }

    pub fn component_id(&self) -> ComponentId {
        self.component.id
    }

    pub fn kind(&self) -> DeviceKind {
        self.component.kind
    }

    /// Pure read of the cached status. Never touches the hub.
    pub fn current_status(&self) -> Status {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Validate a status-update, hand the merged status to `publish`, and
    /// cache it once `publish` succeeds.
    ///
    /// On any error the cache is left as it was.
    pub fn apply_update<F>(&self, update: &StatusUpdate, publish: F) -> Result<Status, MirrorError>
    where
        F: FnOnce(&Status) -> Result<(), MirrorError>,
    {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        let next = status.merge(self.component.id, update)?;
        publish(&next)?;
        *status = next.clone();
        Ok(next)
    }

    /// Forward a command to the hub. Not retried here.
    pub async fn apply_command(&self, command: Command) -> Result<(), CommandError> {
        let channel_command = match self.component.kind {
            DeviceKind::Light => light::channel_command(&command),
            DeviceKind::Switch => switch::channel_command(&command),
            DeviceKind::BinarySensor => None,
            DeviceKind::Cover => cover::channel_command(&command),
            DeviceKind::Thermostat => climate::channel_command(&command),
        }
        .ok_or_else(|| CommandError::Unsupported {
            platform: self.component.kind.platform(),
            service: command.service().to_string(),
        })?;

        tracing::debug!("{} <- {:?}", self.entity_id, channel_command);
        self.component.channel.send(channel_command).await
    }
}

impl Entity for EntityAdapter {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn unique_id(&self) -> String {
        self.component.id.to_string()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn platform(&self) -> &'static str {
        self.component.kind.platform()
    }

    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            manufacturer: MANUFACTURER.to_string(),
            identifiers: vec![("homecenter".to_string(), self.component.id.to_string())],
            name: self.name.clone(),
        }
    }

    fn state(&self) -> String {
        self.current_status().state()
    }

    fn attributes(&self) -> Attributes {
        let mut attributes = self.current_status().attributes();
        attributes.insert("friendly_name".into(), json!(self.name));
        attributes
    }
}
