use super::adapter::Command;
use crate::controller::ChannelCommand;
use crate::controller::InputState;
use crate::engine::Attributes;

/// On/off status shared by switches and binary sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnOffStatus {
    pub on: bool,
}

impl OnOffStatus {
    /// Toggle values above zero mean on; zero and below mean off.
    pub fn from_value(value: i64) -> Self {
        Self { on: value > 0 }
    }

    pub fn from_input(state: InputState) -> Self {
        Self {
            on: state == InputState::On,
        }
    }

    pub fn state(&self) -> &'static str {
        if self.on { "on" } else { "off" }
    }

    pub fn attributes(&self) -> Attributes {
        Attributes::new()
    }
}

pub fn channel_command(command: &Command) -> Option<ChannelCommand> {
    match command {
        Command::TurnOn { brightness: None } => Some(ChannelCommand::TurnOn),
        Command::TurnOff => Some(ChannelCommand::TurnOff),
        _ => None,
    }
}
