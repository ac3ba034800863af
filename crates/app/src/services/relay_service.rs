//! Relay service: the actuator-facing half of the interlock.
//!
//! A relay replays every published transition through the same state
//! machine as the gateway. Groups it owns are written and verified, and a
//! group's flag only changes once its feedback confirms the write. Groups
//! owned elsewhere are tracked logically so the snapshot stays complete.

use dehum_domain::command::Command;
use dehum_domain::error::DehumError;
use dehum_domain::interlock::{ActuatorSnapshot, transition};
use dehum_domain::message::{ActuationResult, BusMessage, StateTransitionEvent, status_topic};

use super::actuation::{ActuatorBank, VerifyPolicy, actuate, observe};
use crate::ports::{BusPublisher, Subscription};

/// Actuator controller owning a subset of groups.
pub struct RelayService<P> {
    name: String,
    status_topic: String,
    publisher: P,
    bank: ActuatorBank,
    policy: VerifyPolicy,
    snapshot: ActuatorSnapshot,
}

impl<P: BusPublisher> RelayService<P> {
    /// Create a relay that reports on `<name>/status`.
    pub fn new(
        name: impl Into<String>,
        publisher: P,
        bank: ActuatorBank,
        policy: VerifyPolicy,
    ) -> Self {
        let name = name.into();
        Self {
            status_topic: status_topic(&name),
            name,
            publisher,
            bank,
            policy,
            snapshot: ActuatorSnapshot::default(),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ActuatorSnapshot {
        self.snapshot
    }

    /// Drive every owned output low so hardware matches the all-off snapshot.
    ///
    /// # Errors
    ///
    /// Returns the first pin error encountered.
    pub fn initialise(&mut self) -> Result<(), DehumError> {
        let groups: Vec<_> = self.bank.groups().collect();
        for group in groups {
            if let Some(pin) = self.bank.get_mut(group) {
                pin.set_level(false)?;
            }
        }
        tracing::info!(relay = %self.name, "owned outputs driven low");
        Ok(())
    }

    /// Decode a transition event and apply its new label.
    ///
    /// Malformed payloads are logged and skipped.
    pub async fn handle_message(&mut self, message: &BusMessage) -> Vec<ActuationResult> {
        let event: StateTransitionEvent = match message.decode() {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(relay = %self.name, topic = %message.topic, error = %err, "skipping malformed transition");
                return Vec::new();
            }
        };
        tracing::debug!(relay = %self.name, previous = ?event.previous, new = %event.new, "transition received");
        self.handle_command(&Command::parse(&event.new)).await
    }

    /// Apply one command and return the results published for it.
    pub async fn handle_command(&mut self, command: &Command) -> Vec<ActuationResult> {
        if *command == Command::Status {
            return self.report_status().await;
        }

        let decision = transition(self.snapshot, command);
        if !decision.admission.is_published() {
            tracing::debug!(relay = %self.name, %command, admission = ?decision.admission, "command ignored");
            return Vec::new();
        }

        let mut results = Vec::new();
        for actuation in decision.actuations {
            let (group, on) = (actuation.group, actuation.on);
            let Some(pin) = self.bank.get_mut(group) else {
                self.snapshot = self.snapshot.with(group, on);
                continue;
            };

            let previous = self.snapshot.is_on(group);
            let result = actuate(pin, group, on, previous, &self.policy).await;
            if result.is_success() {
                self.snapshot = self.snapshot.with(group, on);
                tracing::info!(relay = %self.name, %group, mode = %result.observed, "actuation verified");
            } else {
                tracing::warn!(relay = %self.name, %group, commanded = on, observed = %result.observed, "actuation failed");
            }
            self.publish(result).await;
            results.push(result);
        }
        results
    }

    /// Read back every owned group and compare with its commanded flag.
    pub async fn report_status(&self) -> Vec<ActuationResult> {
        let mut results = Vec::new();
        for group in self.bank.groups() {
            let Some(pin) = self.bank.get(group) else {
                continue;
            };
            let result = observe(pin, group, self.snapshot.is_on(group));
            tracing::info!(relay = %self.name, %group, mode = %result.observed, outcome = ?result.outcome, "status");
            results.push(result);
        }
        for result in &results {
            self.publish(*result).await;
        }
        results
    }

    /// Consume transition events until the subscription closes.
    pub async fn run(mut self, mut subscription: Subscription) {
        tracing::info!(relay = %self.name, "relay started");
        while let Some(message) = subscription.recv().await {
            self.handle_message(&message).await;
        }
        tracing::info!(relay = %self.name, "relay stopped");
    }

    // Publish failures are logged so the remaining actuations still run.
    async fn publish(&self, result: ActuationResult) {
        let message = match BusMessage::json(self.status_topic.as_str(), &result) {
            Ok(message) => message,
            Err(err) => {
                tracing::error!(relay = %self.name, error = %err, "failed to encode status");
                return;
            }
        };
        if let Err(err) = self.publisher.publish(message).await {
            tracing::error!(relay = %self.name, error = %err, "failed to publish status");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::ports::ActuatorIo;
    use dehum_domain::group::{ActuatorGroup, Mode};
    use dehum_domain::interlock::InterlockState;
    use dehum_domain::message::{ActuationOutcome, STATE_TOPIC};
    use tokio::sync::mpsc;

    /// Relay contact whose feedback follows the output, optionally inverted.
    #[derive(Clone, Default)]
    struct FakePin {
        level: Arc<Mutex<bool>>,
        writes: Arc<Mutex<Vec<bool>>>,
        inverted: bool,
    }

    impl FakePin {
        fn inverted() -> Self {
            Self {
                inverted: true,
                ..Self::default()
            }
        }

        fn writes(&self) -> Vec<bool> {
            self.writes.lock().unwrap().clone()
        }
    }

    impl ActuatorIo for FakePin {
        fn set_level(&mut self, high: bool) -> Result<(), DehumError> {
            *self.level.lock().unwrap() = high;
            self.writes.lock().unwrap().push(high);
            Ok(())
        }

        fn read_level(&self) -> Result<bool, DehumError> {
            Ok(*self.level.lock().unwrap() != self.inverted)
        }
    }

    #[derive(Clone, Default)]
    struct RecordingPublisher {
        sent: Arc<Mutex<Vec<BusMessage>>>,
    }

    impl RecordingPublisher {
        fn statuses(&self) -> Vec<(String, ActuationResult)> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|m| (m.topic.clone(), m.decode().unwrap()))
                .collect()
        }
    }

    impl BusPublisher for RecordingPublisher {
        async fn publish(&self, message: BusMessage) -> Result<(), DehumError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    struct Rig {
        relay: RelayService<RecordingPublisher>,
        publisher: RecordingPublisher,
        dehum: FakePin,
        fan: FakePin,
    }

    fn dh_relay(fan: FakePin) -> Rig {
        let dehum = FakePin::default();
        let publisher = RecordingPublisher::default();
        let bank = ActuatorBank::new()
            .with_pin(ActuatorGroup::Dehumidifier, dehum.clone())
            .with_pin(ActuatorGroup::Fan, fan.clone());
        Rig {
            relay: RelayService::new("dhcontrol", publisher.clone(), bank, VerifyPolicy::default()),
            publisher,
            dehum,
            fan,
        }
    }

    fn transition_message(previous: Option<&str>, new: &str) -> BusMessage {
        let event = StateTransitionEvent::new(previous.map(str::to_string), new);
        BusMessage::json(STATE_TOPIC, &event).unwrap()
    }

    fn result(outcome: ActuationOutcome, group: ActuatorGroup, observed: Mode) -> ActuationResult {
        ActuationResult {
            outcome,
            group,
            observed,
        }
    }

    #[tokio::test]
    async fn should_run_dehumidifier_and_report_success() {
        let mut rig = dh_relay(FakePin::default());
        rig.relay
            .handle_message(&transition_message(Some("all off"), "run dehum"))
            .await;

        assert_eq!(rig.dehum.writes(), vec![true]);
        assert_eq!(rig.relay.snapshot().interlock, InterlockState::DehumOn);
        assert_eq!(
            rig.publisher.statuses(),
            vec![(
                "dhcontrol/status".to_string(),
                result(ActuationOutcome::Success, ActuatorGroup::Dehumidifier, Mode::On)
            )]
        );
    }

    #[tokio::test]
    async fn should_ignore_fan_while_dehumidifier_runs() {
        let mut rig = dh_relay(FakePin::default());
        rig.relay.handle_command(&Command::RunDehumidifier).await;

        let results = rig.relay.handle_command(&Command::RunFan).await;

        assert!(results.is_empty());
        assert!(rig.fan.writes().is_empty());
        assert_eq!(rig.publisher.statuses().len(), 1);
        assert_eq!(rig.relay.snapshot().interlock, InterlockState::DehumOn);
    }

    #[tokio::test]
    async fn should_kill_from_fan_on_and_write_every_owned_output() {
        let mut rig = dh_relay(FakePin::default());
        rig.relay.handle_command(&Command::RunFan).await;

        let results = rig.relay.handle_command(&Command::Kill).await;

        assert_eq!(rig.fan.writes(), vec![true, false]);
        assert_eq!(rig.dehum.writes(), vec![false]);
        assert_eq!(
            results,
            vec![
                result(ActuationOutcome::Success, ActuatorGroup::Dehumidifier, Mode::Off),
                result(ActuationOutcome::Success, ActuatorGroup::Fan, Mode::Off),
            ]
        );
        assert_eq!(rig.relay.snapshot(), ActuatorSnapshot::default());
    }

    #[tokio::test]
    async fn should_do_nothing_when_shedding_idle_fan() {
        let mut rig = dh_relay(FakePin::default());
        let results = rig.relay.handle_command(&Command::ShedFan).await;

        assert!(results.is_empty());
        assert!(rig.fan.writes().is_empty());
        assert!(rig.publisher.statuses().is_empty());
    }

    #[tokio::test]
    async fn should_report_failure_and_keep_fan_off_when_feedback_inverted() {
        let mut rig = dh_relay(FakePin::inverted());
        let results = rig.relay.handle_command(&Command::RunFan).await;

        let expected = result(ActuationOutcome::Failed, ActuatorGroup::Fan, Mode::Off);
        assert_eq!(results, vec![expected]);
        assert_eq!(
            rig.publisher.statuses(),
            vec![("dhcontrol/status".to_string(), expected)]
        );
        assert_eq!(rig.relay.snapshot().interlock, InterlockState::BothOff);

        let encoded = &rig.publisher.sent.lock().unwrap()[0].payload;
        assert_eq!(encoded, br#"["FAILED","fan","OFF"]"#);
    }

    #[tokio::test]
    async fn should_track_groups_owned_elsewhere_without_io() {
        let green = FakePin::default();
        let red = FakePin::default();
        let publisher = RecordingPublisher::default();
        let bank = ActuatorBank::new()
            .with_pin(ActuatorGroup::GreenLed, green.clone())
            .with_pin(ActuatorGroup::RedLed, red.clone());
        let mut relay = RelayService::new("LEDcontrol", publisher.clone(), bank, VerifyPolicy::default());

        relay.handle_command(&Command::RunDehumidifier).await;
        assert_eq!(relay.snapshot().interlock, InterlockState::DehumOn);
        assert!(publisher.statuses().is_empty());

        relay.handle_command(&Command::parse("red on")).await;
        relay.handle_command(&Command::Kill).await;

        assert_eq!(red.writes(), vec![true, false]);
        assert_eq!(green.writes(), vec![false]);
        assert_eq!(relay.snapshot(), ActuatorSnapshot::default());
        let topics: Vec<String> = publisher.statuses().into_iter().map(|(t, _)| t).collect();
        assert!(topics.iter().all(|t| t == "LEDcontrol/status"));
        assert_eq!(topics.len(), 3);
    }

    #[tokio::test]
    async fn should_publish_status_for_every_owned_group() {
        let mut rig = dh_relay(FakePin::default());
        rig.relay.handle_command(&Command::RunDehumidifier).await;
        // Someone switched the dehumidifier off by hand.
        *rig.dehum.level.lock().unwrap() = false;

        let results = rig.relay.handle_command(&Command::Status).await;

        assert_eq!(
            results,
            vec![
                result(ActuationOutcome::Failed, ActuatorGroup::Dehumidifier, Mode::Off),
                result(ActuationOutcome::Success, ActuatorGroup::Fan, Mode::Off),
            ]
        );
        assert_eq!(rig.relay.snapshot().interlock, InterlockState::DehumOn);
        assert_eq!(rig.dehum.writes(), vec![true]);
    }

    #[tokio::test]
    async fn should_skip_malformed_payload() {
        let mut rig = dh_relay(FakePin::default());
        let message = BusMessage {
            topic: STATE_TOPIC.to_string(),
            payload: b"run dehum".to_vec(),
        };
        assert!(rig.relay.handle_message(&message).await.is_empty());
        assert_eq!(rig.relay.snapshot(), ActuatorSnapshot::default());
    }

    #[tokio::test]
    async fn should_ignore_initial_announcement() {
        let mut rig = dh_relay(FakePin::default());
        let results = rig
            .relay
            .handle_message(&transition_message(None, "all off"))
            .await;
        assert!(results.is_empty());
        assert!(rig.dehum.writes().is_empty());
    }

    #[tokio::test]
    async fn should_drive_owned_outputs_low_on_initialise() {
        let mut rig = dh_relay(FakePin::default());
        rig.relay.initialise().unwrap();
        assert_eq!(rig.dehum.writes(), vec![false]);
        assert_eq!(rig.fan.writes(), vec![false]);
    }

    #[tokio::test]
    async fn should_process_subscription_until_closed() {
        let rig = dh_relay(FakePin::default());
        let publisher = rig.publisher.clone();
        let (tx, rx) = mpsc::channel(8);

        tx.send(transition_message(None, "all off")).await.unwrap();
        tx.send(transition_message(Some("all off"), "run fan"))
            .await
            .unwrap();
        tx.send(transition_message(Some("run fan"), "shed fan"))
            .await
            .unwrap();
        drop(tx);

        rig.relay.run(rx).await;

        assert_eq!(rig.fan.writes(), vec![true, false]);
        assert_eq!(publisher.statuses().len(), 2);
    }
}
