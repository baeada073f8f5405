use serde_json::json;
use strum::Display;

use super::adapter::Command;
use crate::controller::ChannelCommand;
use crate::controller::ShadeState;
use crate::engine::Attributes;

/// Cover entity feature flags.
pub const SUPPORT_OPEN: u32 = 1;
pub const SUPPORT_CLOSE: u32 = 2;
pub const SUPPORT_STOP: u32 = 8;

/// Host cover states. There is no numeric position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum CoverState {
    Open,
    Closed,
    Opening,
    Closing,
}

impl CoverState {
    /// Derive the host state from a shade's transition.
    ///
    /// A stopped shade is open unless it stopped from fully closed.
    pub fn from_transition(previous: ShadeState, current: ShadeState) -> Self {
        match current {
            ShadeState::Open => Self::Open,
            ShadeState::Closed => Self::Closed,
            ShadeState::Opening => Self::Opening,
            ShadeState::Closing => Self::Closing,
            ShadeState::Stopped => match previous {
                ShadeState::Closed => Self::Closed,
                _ => Self::Open,
            },
        }
    }

    /// State from a standalone reading, with no transition to go on.
    pub fn from_reading(state: ShadeState) -> Self {
        Self::from_transition(state, state)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverStatus {
    pub state: CoverState,
}

impl CoverStatus {
    pub fn state(&self) -> String {
        self.state.to_string()
    }

    pub fn attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert(
            "supported_features".into(),
            json!(SUPPORT_OPEN | SUPPORT_CLOSE | SUPPORT_STOP),
        );
        attributes
    }
}

pub fn channel_command(command: &Command) -> Option<ChannelCommand> {
    match command {
        Command::OpenCover => Some(ChannelCommand::Open),
        Command::CloseCover => Some(ChannelCommand::Close),
        Command::StopCover => Some(ChannelCommand::Stop),
        _ => None,
    }
}
