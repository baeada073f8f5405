use serde_json::json;

use super::adapter::Command;
use crate::controller::ChannelCommand;
use crate::controller::ComponentId;
use crate::controller::DEVICE_MAX_BRIGHTNESS;
use crate::controller::DeviceKind;
use crate::engine::Attributes;
use crate::error::MirrorError;

/// Light entity feature flag for transitions.
pub const SUPPORT_TRANSITION: u32 = 32;

/// Highest brightness on the host scale.
pub const HOST_MAX_BRIGHTNESS: u8 = 255;

/// Device scale (0..=200) to host scale (0..=255), rounding down.
pub fn brightness_to_host(device: u8) -> u8 {
    let device = u32::from(device.min(DEVICE_MAX_BRIGHTNESS));
    (device * u32::from(HOST_MAX_BRIGHTNESS) / u32::from(DEVICE_MAX_BRIGHTNESS)) as u8
}

/// Host scale (0..=255) to device scale (0..=200), rounding up.
///
/// Rounding up here and down in [`brightness_to_host`] makes every device
/// value survive a trip through the host scale unchanged.
pub fn brightness_to_device(host: u8) -> u8 {
    let max_host = u32::from(HOST_MAX_BRIGHTNESS);
    ((u32::from(host) * u32::from(DEVICE_MAX_BRIGHTNESS) + max_host - 1) / max_host) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightStatus {
    /// Host scale; zero means off
    pub brightness: u8,
}

impl LightStatus {
    pub fn from_device(brightness: u8) -> Self {
        Self {
            brightness: brightness_to_host(brightness),
        }
    }

    pub fn is_on(&self) -> bool {
        self.brightness > 0
    }

    pub fn apply_update(id: ComponentId, brightness: u8) -> Result<Self, MirrorError> {
        if brightness > DEVICE_MAX_BRIGHTNESS {
            return Err(MirrorError::InvalidPayload {
                id,
                kind: DeviceKind::Light,
                reason: format!(
                    "brightness {} is above {}",
                    brightness, DEVICE_MAX_BRIGHTNESS
                ),
            });
        }
        Ok(Self::from_device(brightness))
    }

    pub fn state(&self) -> &'static str {
        if self.is_on() { "on" } else { "off" }
    }

    pub fn attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("brightness".into(), json!(self.brightness));
        if self.is_on() {
            attributes.insert("color_mode".into(), json!("brightness"));
        } else {
            attributes.insert("color_mode".into(), json!(null));
        }
        attributes.insert("supported_color_modes".into(), json!(["brightness"]));
        attributes.insert("supported_features".into(), json!(SUPPORT_TRANSITION));
        attributes
    }
}

/// Translate a light command for the dimmer channel.
pub fn channel_command(command: &Command) -> Option<ChannelCommand> {
    match command {
        Command::TurnOn {
            brightness: Some(brightness),
        } => Some(ChannelCommand::SetBrightness(brightness_to_device(
            *brightness,
        ))),
        Command::TurnOn { brightness: None } => Some(ChannelCommand::RestoreBrightness),
        Command::TurnOff => Some(ChannelCommand::SetBrightness(0)),
        _ => None,
    }
}
