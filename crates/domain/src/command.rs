//! Command: the closed vocabulary an operator can type.
//!
//! Parsing trims surrounding whitespace and then matches the literal text
//! exactly; case and wording matter. Everything else is
//! [`Command::Invalid`].

use std::fmt;

use crate::group::{ActuatorGroup, LedColor};

/// Literal command words, in the order shown by `help`.
pub const VOCABULARY: [&str; 11] = [
    "run dehum",
    "shed dehum",
    "run fan",
    "shed fan",
    "green on",
    "green off",
    "red on",
    "red off",
    "kill",
    "status",
    "help",
];

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    RunDehumidifier,
    ShedDehumidifier,
    RunFan,
    ShedFan,
    LedOn(LedColor),
    LedOff(LedColor),
    /// Turn every output off, regardless of the current state.
    Kill,
    /// Ask relays to read back and report every output.
    Status,
    /// Show usage; never leaves the gateway.
    Help,
    /// Anything outside the vocabulary, with the trimmed raw text.
    Invalid(String),
}

impl Command {
    /// Parse operator text into a command.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match text.trim() {
            "run dehum" => Self::RunDehumidifier,
            "shed dehum" => Self::ShedDehumidifier,
            "run fan" => Self::RunFan,
            "shed fan" => Self::ShedFan,
            "green on" => Self::LedOn(LedColor::Green),
            "green off" => Self::LedOff(LedColor::Green),
            "red on" => Self::LedOn(LedColor::Red),
            "red off" => Self::LedOff(LedColor::Red),
            "kill" => Self::Kill,
            "status" => Self::Status,
            "help" => Self::Help,
            other => Self::Invalid(other.to_string()),
        }
    }

    /// Canonical label published on the bus when this command is accepted.
    ///
    /// For [`Invalid`](Self::Invalid) this is the raw text.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::RunDehumidifier => "run dehum",
            Self::ShedDehumidifier => "shed dehum",
            Self::RunFan => "run fan",
            Self::ShedFan => "shed fan",
            Self::LedOn(LedColor::Green) => "green on",
            Self::LedOff(LedColor::Green) => "green off",
            Self::LedOn(LedColor::Red) => "red on",
            Self::LedOff(LedColor::Red) => "red off",
            Self::Kill => "kill",
            Self::Status => "status",
            Self::Help => "help",
            Self::Invalid(raw) => raw,
        }
    }

    /// The group and level a switching command targets.
    #[must_use]
    pub fn target(&self) -> Option<(ActuatorGroup, bool)> {
        match self {
            Self::RunDehumidifier => Some((ActuatorGroup::Dehumidifier, true)),
            Self::ShedDehumidifier => Some((ActuatorGroup::Dehumidifier, false)),
            Self::RunFan => Some((ActuatorGroup::Fan, true)),
            Self::ShedFan => Some((ActuatorGroup::Fan, false)),
            Self::LedOn(color) => Some((color.group(), true)),
            Self::LedOff(color) => Some((color.group(), false)),
            Self::Kill | Self::Status | Self::Help | Self::Invalid(_) => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
