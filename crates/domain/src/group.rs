//! Actuator groups: the physical outputs the system can switch.
//!
//! [`Dehumidifier`](ActuatorGroup::Dehumidifier) drives the compressor and its
//! fan as one unit and is interlocked against the standalone
//! [`Fan`](ActuatorGroup::Fan). The two indicator LEDs are independent.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single switchable output with one logical on/off flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActuatorGroup {
    /// Compressor and fan pair, switched together.
    #[serde(rename = "dehumidifier")]
    Dehumidifier,
    /// Standalone fan.
    #[serde(rename = "fan")]
    Fan,
    /// Green indicator LED.
    #[serde(rename = "green LED")]
    GreenLed,
    /// Red indicator LED.
    #[serde(rename = "red LED")]
    RedLed,
}

impl ActuatorGroup {
    /// Every group, in reporting order.
    pub const ALL: [Self; 4] = [Self::Dehumidifier, Self::Fan, Self::GreenLed, Self::RedLed];

    /// Component name used on the status topic and in operator messages.
    #[must_use]
    pub const fn component(self) -> &'static str {
        match self {
            Self::Dehumidifier => "dehumidifier",
            Self::Fan => "fan",
            Self::GreenLed => "green LED",
            Self::RedLed => "red LED",
        }
    }

    /// Whether this group takes part in the dehumidifier/fan interlock.
    #[must_use]
    pub const fn is_interlocked(self) -> bool {
        matches!(self, Self::Dehumidifier | Self::Fan)
    }
}

impl fmt::Display for ActuatorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.component())
    }
}

/// Colour of an indicator LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedColor {
    Green,
    Red,
}

impl LedColor {
    /// The actuator group backing this LED.
    #[must_use]
    pub const fn group(self) -> ActuatorGroup {
        match self {
            Self::Green => ActuatorGroup::GreenLed,
            Self::Red => ActuatorGroup::RedLed,
        }
    }

    /// Lowercase colour word used in operator commands.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Red => "red",
        }
    }
}

/// Measured on/off mode of an output, as reported on the status topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    On,
    Off,
}

impl Mode {
    /// Map a pin level (`true` = high) to a mode.
    #[must_use]
    pub const fn from_level(high: bool) -> Self {
        if high { Self::On } else { Self::Off }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => f.write_str("ON"),
            Self::Off => f.write_str("OFF"),
        }
    }
}
