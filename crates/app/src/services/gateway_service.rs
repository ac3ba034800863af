//! Gateway service: turns operator lines into replies and bus events.
//!
//! The gateway keeps its own copy of the actuator snapshot so it can answer
//! immediately ("already running", interlock rejections) without waiting on
//! any relay. Only admitted commands reach the bus.

use dehum_domain::command::{Command, VOCABULARY};
use dehum_domain::error::DehumError;
use dehum_domain::interlock::{ActuatorSnapshot, Admission, transition};
use dehum_domain::message::{BusMessage, STATE_TOPIC, StateTransitionEvent};

use crate::ports::BusPublisher;

/// Label published at start-up, before any command.
pub const DEFAULT_INITIAL_STATE: &str = "all off";

/// Longest operator line accepted, line terminator included.
pub const MAX_LINE_LEN: usize = 256;

/// Behaviour switches for the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Label shown and announced before the first command.
    pub initial_state: String,
    /// When false, `status` is answered as an invalid command.
    pub status_enabled: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            initial_state: DEFAULT_INITIAL_STATE.to_string(),
            status_enabled: true,
        }
    }
}

/// What the operator sees after one line, and what went on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    /// Notice text, possibly empty. The prompt is not included.
    pub text: String,
    /// The event published for this line, if any.
    pub published: Option<StateTransitionEvent>,
}

/// Operator-facing half of the interlock.
pub struct GatewayService<P> {
    publisher: P,
    config: GatewayConfig,
    snapshot: ActuatorSnapshot,
    label: String,
}

impl<P: BusPublisher> GatewayService<P> {
    /// Create a gateway with everything off and the configured initial label.
    pub fn new(publisher: P, config: GatewayConfig) -> Self {
        let label = config.initial_state.clone();
        Self {
            publisher,
            config,
            snapshot: ActuatorSnapshot::default(),
            label,
        }
    }

    /// Publish the initial label with no previous state.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be encoded or published.
    pub async fn announce(&self) -> Result<(), DehumError> {
        let event = StateTransitionEvent::new(None, self.label.clone());
        self.publisher
            .publish(BusMessage::json(STATE_TOPIC, &event)?)
            .await?;
        tracing::info!(state = %self.label, "announced initial state");
        Ok(())
    }

    /// The prompt shown after every line.
    #[must_use]
    pub fn prompt(&self) -> String {
        format!("\nCurrent state: {}. Enter new state: ", self.label)
    }

    /// The last published label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn snapshot(&self) -> ActuatorSnapshot {
        self.snapshot
    }

    /// Handle one operator line.
    ///
    /// Admitted commands are published before the local state changes, so a
    /// failed publish leaves the gateway exactly as it was. Lines longer than
    /// [`MAX_LINE_LEN`] are invalid whatever they contain.
    ///
    /// # Errors
    ///
    /// Returns an error if the transition event cannot be published.
    pub async fn handle_line(&mut self, line: &str) -> Result<Reply, DehumError> {
        if line.len() > MAX_LINE_LEN {
            tracing::warn!(len = line.len(), "rejecting overlong line");
            return Ok(Reply {
                text: notice(&Admission::Invalid),
                published: None,
            });
        }

        let text = line.trim();
        if text.is_empty() {
            return Ok(Reply::default());
        }

        let command = match Command::parse(text) {
            Command::Status if !self.config.status_enabled => Command::Invalid(text.to_string()),
            command => command,
        };
        let decision = transition(self.snapshot, &command);
        let notice = notice(&decision.admission);

        if !decision.admission.is_published() {
            tracing::debug!(%command, admission = ?decision.admission, "command handled locally");
            return Ok(Reply {
                text: notice,
                published: None,
            });
        }

        let event = StateTransitionEvent::new(Some(self.label.clone()), command.label());
        self.publisher
            .publish(BusMessage::json(STATE_TOPIC, &event)?)
            .await?;

        self.snapshot = decision.next;
        self.label = command.label().to_string();
        tracing::info!(%command, previous = ?event.previous, "state transition published");

        Ok(Reply {
            text: notice,
            published: Some(event),
        })
    }
}

fn notice(admission: &Admission) -> String {
    match admission {
        Admission::Accepted | Admission::Status => String::new(),
        Admission::Kill => "\n** Sending command to turn off the compressor and fan. **\n".to_string(),
        Admission::Help => help_text(),
        Admission::AlreadyInState { group, on } => {
            let level = match (group.is_interlocked(), on) {
                (true, true) => "running",
                (false, true) => "on",
                (_, false) => "off",
            };
            format!("\n** SUCCESS ** - The {group} is already {level}.\n")
        }
        Admission::Interlocked { requested, blocking } => format!(
            "\n** FAILED ** - Turn off the {blocking} before trying to control the {requested}.\n"
        ),
        Admission::Invalid => format!(
            "\n** FAILED ** - You entered an invalid command. Valid commands are... \n               {}\n",
            command_list()
        ),
    }
}

fn help_text() -> String {
    format!(
        "\n************************ Instructions ************************\n   \
         Valid commands are...\n     {}\n   \
         For help, type 'help'.\n\
         ************************ Instructions ************************\n",
        command_list()
    )
}

fn command_list() -> String {
    format!("| {} |", VOCABULARY.join(" | "))
}
