//! Interlock state machine: the one transition function shared by the
//! operator gateway and every actuator relay.
//!
//! [`transition`] is pure: given the current [`ActuatorSnapshot`] and a
//! [`Command`] it returns a [`Decision`] describing whether the command is
//! admitted, which outputs must be written, and the snapshot that results
//! when every write succeeds. The gateway adopts [`Decision::next`] directly;
//! a relay applies each [`Actuation`] to its own snapshot only once the
//! hardware confirms it.
//!
//! ## Rules
//!
//! | State | Admitted | Rejected (local only) |
//! |-------|----------|-----------------------|
//! | `BothOff` | `run dehum`, `run fan` | `shed …` → already off |
//! | `DehumOn` | `shed dehum` | `run dehum` → already running; fan commands → interlocked |
//! | `FanOn` | `shed fan` | `run fan` → already running; dehum commands → interlocked |
//!
//! `kill` and `status` are admitted from every state. LED commands are
//! admitted whenever they change the LED and never interact with the
//! interlock.

use crate::command::Command;
use crate::group::ActuatorGroup;

/// Which member of the exclusive dehumidifier/fan pair is running.
///
/// Having a single enum for the pair makes "both on" unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterlockState {
    #[default]
    BothOff,
    DehumOn,
    FanOn,
}

impl InterlockState {
    /// The interlocked group currently running, if any.
    #[must_use]
    pub const fn active(self) -> Option<ActuatorGroup> {
        match self {
            Self::BothOff => None,
            Self::DehumOn => Some(ActuatorGroup::Dehumidifier),
            Self::FanOn => Some(ActuatorGroup::Fan),
        }
    }
}

/// Logical on/off flags of every actuator group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorSnapshot {
    pub interlock: InterlockState,
    pub green_led: bool,
    pub red_led: bool,
}

impl ActuatorSnapshot {
    /// Whether `group` is commanded on.
    #[must_use]
    pub fn is_on(&self, group: ActuatorGroup) -> bool {
        match group {
            ActuatorGroup::Dehumidifier => self.interlock == InterlockState::DehumOn,
            ActuatorGroup::Fan => self.interlock == InterlockState::FanOn,
            ActuatorGroup::GreenLed => self.green_led,
            ActuatorGroup::RedLed => self.red_led,
        }
    }

    /// Return a copy with `group` set to `on`.
    ///
    /// Turning an interlocked group on replaces whichever member was
    /// running; [`transition`] only ever asks for that from `BothOff`.
    /// Turning off a group that is not the running one leaves the pair
    /// untouched.
    #[must_use]
    pub fn with(mut self, group: ActuatorGroup, on: bool) -> Self {
        match (group, on) {
            (ActuatorGroup::Dehumidifier, true) => self.interlock = InterlockState::DehumOn,
            (ActuatorGroup::Fan, true) => self.interlock = InterlockState::FanOn,
            (ActuatorGroup::Dehumidifier | ActuatorGroup::Fan, false) => {
                if self.interlock.active() == Some(group) {
                    self.interlock = InterlockState::BothOff;
                }
            }
            (ActuatorGroup::GreenLed, on) => self.green_led = on,
            (ActuatorGroup::RedLed, on) => self.red_led = on,
        }
        self
    }
}

/// A write of one output level, requested by an admitted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actuation {
    pub group: ActuatorGroup,
    pub on: bool,
}

/// How the state machine judged a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// A switching command changed one group.
    Accepted,
    /// Everything is forced off.
    Kill,
    /// Read-back request; nothing changes.
    Status,
    /// Usage text; nothing leaves the gateway.
    Help,
    /// The group is already at the requested level.
    AlreadyInState { group: ActuatorGroup, on: bool },
    /// The requested group conflicts with the one currently running.
    Interlocked {
        requested: ActuatorGroup,
        blocking: ActuatorGroup,
    },
    /// Text outside the vocabulary.
    Invalid,
}

impl Admission {
    /// Whether the command must be broadcast on the bus.
    ///
    /// Rejections and no-ops stay local so relays never see them.
    #[must_use]
    pub const fn is_published(&self) -> bool {
        matches!(self, Self::Accepted | Self::Kill | Self::Status)
    }
}

/// Result of running one command through the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub admission: Admission,
    /// Output writes to perform, in order.
    pub actuations: Vec<Actuation>,
    /// Snapshot once every actuation has succeeded.
    pub next: ActuatorSnapshot,
}

impl Decision {
    fn unchanged(admission: Admission, snapshot: ActuatorSnapshot) -> Self {
        Self {
            admission,
            actuations: Vec::new(),
            next: snapshot,
        }
    }

    fn switch(snapshot: ActuatorSnapshot, group: ActuatorGroup, on: bool) -> Self {
        Self {
            admission: Admission::Accepted,
            actuations: vec![Actuation { group, on }],
            next: snapshot.with(group, on),
        }
    }
}

/// Apply `command` to `snapshot`.
#[must_use]
pub fn transition(snapshot: ActuatorSnapshot, command: &Command) -> Decision {
    match command {
        Command::Kill => Decision {
            admission: Admission::Kill,
            actuations: ActuatorGroup::ALL
                .into_iter()
                .map(|group| Actuation { group, on: false })
                .collect(),
            next: ActuatorSnapshot::default(),
        },
        Command::Status => Decision::unchanged(Admission::Status, snapshot),
        Command::Help => Decision::unchanged(Admission::Help, snapshot),
        Command::Invalid(_) => Decision::unchanged(Admission::Invalid, snapshot),
        switching => match switching.target() {
            Some((group, on)) if group.is_interlocked() => {
                switch_interlocked(snapshot, group, on)
            }
            Some((group, on)) => {
                if snapshot.is_on(group) == on {
                    Decision::unchanged(Admission::AlreadyInState { group, on }, snapshot)
                } else {
                    Decision::switch(snapshot, group, on)
                }
            }
            None => Decision::unchanged(Admission::Invalid, snapshot),
        },
    }
}

fn switch_interlocked(snapshot: ActuatorSnapshot, group: ActuatorGroup, on: bool) -> Decision {
    match snapshot.interlock.active() {
        Some(running) if running != group => Decision::unchanged(
            Admission::Interlocked {
                requested: group,
                blocking: running,
            },
            snapshot,
        ),
        Some(_) if on => Decision::unchanged(Admission::AlreadyInState { group, on }, snapshot),
        None if !on => Decision::unchanged(Admission::AlreadyInState { group, on }, snapshot),
        _ => Decision::switch(snapshot, group, on),
    }
}
