//! Bus messages: what the gateway and relays say to each other.
//!
//! Payloads are JSON arrays:
//!
//! | Topic | Payload |
//! |-------|---------|
//! | `userinput/state` | `[previous_label \| null, new_label]` |
//! | `<relay>/status` | `["SUCCESS" \| "FAILED", component, "ON" \| "OFF"]` |

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::PayloadError;
use crate::group::{ActuatorGroup, Mode};

/// Topic carrying [`StateTransitionEvent`]s from the gateway.
pub const STATE_TOPIC: &str = "userinput/state";

/// Topic on which the relay called `relay` publishes [`ActuationResult`]s.
#[must_use]
pub fn status_topic(relay: &str) -> String {
    format!("{relay}/status")
}

/// Whether `topic` is matched by a subscription on `prefix`.
#[must_use]
pub fn topic_matches(prefix: &str, topic: &str) -> bool {
    topic.starts_with(prefix)
}

/// A published change of the gateway's current-state label.
///
/// Carried opaquely: subscribers parse `new` themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(Option<String>, String)", into = "(Option<String>, String)")]
pub struct StateTransitionEvent {
    pub previous: Option<String>,
    pub new: String,
}

impl StateTransitionEvent {
    #[must_use]
    pub fn new(previous: Option<String>, new: impl Into<String>) -> Self {
        Self {
            previous,
            new: new.into(),
        }
    }
}

impl From<(Option<String>, String)> for StateTransitionEvent {
    fn from((previous, new): (Option<String>, String)) -> Self {
        Self { previous, new }
    }
}

impl From<StateTransitionEvent> for (Option<String>, String) {
    fn from(event: StateTransitionEvent) -> Self {
        (event.previous, event.new)
    }
}

/// Whether a write was confirmed by the feedback pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActuationOutcome {
    Success,
    Failed,
}

/// Verified result of one write-then-read cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "(ActuationOutcome, ActuatorGroup, Mode)",
    into = "(ActuationOutcome, ActuatorGroup, Mode)"
)]
pub struct ActuationResult {
    pub outcome: ActuationOutcome,
    pub group: ActuatorGroup,
    /// What the feedback pin reported.
    pub observed: Mode,
}

impl ActuationResult {
    /// Compare the commanded level with the observed one.
    #[must_use]
    pub fn verify(group: ActuatorGroup, commanded_on: bool, observed_on: bool) -> Self {
        let outcome = if commanded_on == observed_on {
            ActuationOutcome::Success
        } else {
            ActuationOutcome::Failed
        };
        Self {
            outcome,
            group,
            observed: Mode::from_level(observed_on),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == ActuationOutcome::Success
    }
}

impl From<(ActuationOutcome, ActuatorGroup, Mode)> for ActuationResult {
    fn from((outcome, group, observed): (ActuationOutcome, ActuatorGroup, Mode)) -> Self {
        Self {
            outcome,
            group,
            observed,
        }
    }
}

impl From<ActuationResult> for (ActuationOutcome, ActuatorGroup, Mode) {
    fn from(result: ActuationResult) -> Self {
        (result.outcome, result.group, result.observed)
    }
}

/// A raw message on the bus: topic plus encoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl BusMessage {
    /// Encode `body` as JSON for `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Json`] if `body` cannot be serialized.
    pub fn json<T: Serialize>(topic: impl Into<String>, body: &T) -> Result<Self, PayloadError> {
        Ok(Self {
            topic: topic.into(),
            payload: serde_json::to_vec(body)?,
        })
    }

    /// Decode the payload as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Json`] if the payload is not valid JSON of
    /// the requested shape.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}
