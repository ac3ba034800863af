//! Verified actuation: write an output, then confirm it through the
//! paired feedback input.

use std::collections::BTreeMap;
use std::time::Duration;

use dehum_domain::group::{ActuatorGroup, Mode};
use dehum_domain::message::{ActuationOutcome, ActuationResult};

use crate::ports::ActuatorIo;

/// How long to wait before reading back, and how many reads to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyPolicy {
    /// Delay before each read.
    pub settle: Duration,
    /// Number of reads before giving up. Treated as at least one.
    pub attempts: u32,
}

impl Default for VerifyPolicy {
    fn default() -> Self {
        Self {
            settle: Duration::ZERO,
            attempts: 1,
        }
    }
}

/// The actuator groups one relay owns, each with its pin pair.
#[derive(Default)]
pub struct ActuatorBank {
    pins: BTreeMap<ActuatorGroup, Box<dyn ActuatorIo>>,
}

impl ActuatorBank {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with_pin(mut self, group: ActuatorGroup, pin: impl ActuatorIo + 'static) -> Self {
        self.insert(group, Box::new(pin));
        self
    }

    /// Attach `pin` to `group`, replacing any previous binding.
    pub fn insert(&mut self, group: ActuatorGroup, pin: Box<dyn ActuatorIo>) {
        self.pins.insert(group, pin);
    }

    #[must_use]
    pub fn owns(&self, group: ActuatorGroup) -> bool {
        self.pins.contains_key(&group)
    }

    /// Owned groups in reporting order.
    pub fn groups(&self) -> impl Iterator<Item = ActuatorGroup> + '_ {
        self.pins.keys().copied()
    }

    #[must_use]
    pub fn get(&self, group: ActuatorGroup) -> Option<&dyn ActuatorIo> {
        self.pins.get(&group).map(|pin| &**pin)
    }

    pub fn get_mut(&mut self, group: ActuatorGroup) -> Option<&mut (dyn ActuatorIo + 'static)> {
        self.pins.get_mut(&group).map(|pin| &mut **pin)
    }
}

/// Drive `pin` to `on` and read back until it agrees or attempts run out.
///
/// `previous_on` is the commanded level before this write; it is reported
/// as the observed level when no read succeeds. I/O errors always yield
/// [`ActuationOutcome::Failed`].
pub async fn actuate(
    pin: &mut dyn ActuatorIo,
    group: ActuatorGroup,
    on: bool,
    previous_on: bool,
    policy: &VerifyPolicy,
) -> ActuationResult {
    if let Err(err) = pin.set_level(on) {
        tracing::error!(%group, on, error = %err, "failed to write output");
        return failed(group, previous_on);
    }

    let mut last_read = None;
    for attempt in 1..=policy.attempts.max(1) {
        if !policy.settle.is_zero() {
            tokio::time::sleep(policy.settle).await;
        }
        match pin.read_level() {
            Ok(level) if level == on => {
                return ActuationResult::verify(group, on, level);
            }
            Ok(level) => {
                tracing::debug!(%group, attempt, observed = level, "feedback disagrees with output");
                last_read = Some(level);
            }
            Err(err) => {
                tracing::error!(%group, attempt, error = %err, "failed to read feedback");
            }
        }
    }

    match last_read {
        Some(level) => ActuationResult::verify(group, on, level),
        None => failed(group, previous_on),
    }
}

/// Read `pin` once and compare it with the commanded level.
///
/// A read error is reported as a failure observing `commanded_on`'s
/// opposite, since nothing could be confirmed.
pub fn observe(pin: &dyn ActuatorIo, group: ActuatorGroup, commanded_on: bool) -> ActuationResult {
    match pin.read_level() {
        Ok(level) => ActuationResult::verify(group, commanded_on, level),
        Err(err) => {
            tracing::error!(%group, error = %err, "failed to read feedback");
            failed(group, !commanded_on)
        }
    }
}

fn failed(group: ActuatorGroup, observed_on: bool) -> ActuationResult {
    ActuationResult {
        outcome: ActuationOutcome::Failed,
        group,
        observed: Mode::from_level(observed_on),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;
    use dehum_domain::error::DehumError;

    /// Pin whose reads come from a script; writes are recorded.
    #[derive(Clone, Default)]
    struct ScriptedPin {
        writes: Arc<Mutex<Vec<bool>>>,
        reads: Arc<Mutex<VecDeque<Result<bool, ()>>>>,
        fail_write: bool,
    }

    impl ScriptedPin {
        fn reading(levels: &[Result<bool, ()>]) -> Self {
            Self {
                reads: Arc::new(Mutex::new(levels.iter().copied().collect())),
                ..Self::default()
            }
        }
    }

    impl ActuatorIo for ScriptedPin {
        fn set_level(&mut self, high: bool) -> Result<(), DehumError> {
            if self.fail_write {
                return Err(DehumError::Actuator("write refused".into()));
            }
            self.writes.lock().unwrap().push(high);
            Ok(())
        }

        fn read_level(&self) -> Result<bool, DehumError> {
            match self.reads.lock().unwrap().pop_front() {
                Some(Ok(level)) => Ok(level),
                Some(Err(())) | None => Err(DehumError::Actuator("read refused".into())),
            }
        }
    }

    #[tokio::test]
    async fn should_succeed_when_feedback_matches() {
        let mut pin = ScriptedPin::reading(&[Ok(true)]);
        let result = actuate(
            &mut pin,
            ActuatorGroup::Dehumidifier,
            true,
            false,
            &VerifyPolicy::default(),
        )
        .await;
        assert!(result.is_success());
        assert_eq!(result.observed, Mode::On);
        assert_eq!(*pin.writes.lock().unwrap(), vec![true]);
    }

    #[tokio::test]
    async fn should_fail_with_observed_level_on_mismatch() {
        let mut pin = ScriptedPin::reading(&[Ok(false)]);
        let result = actuate(&mut pin, ActuatorGroup::Fan, true, false, &VerifyPolicy::default()).await;
        assert_eq!(result.outcome, ActuationOutcome::Failed);
        assert_eq!(result.observed, Mode::Off);
    }

    #[tokio::test(start_paused = true)]
    async fn should_retry_reads_until_feedback_settles() {
        let mut pin = ScriptedPin::reading(&[Ok(false), Ok(false), Ok(true)]);
        let policy = VerifyPolicy {
            settle: Duration::from_millis(50),
            attempts: 3,
        };
        let result = actuate(&mut pin, ActuatorGroup::GreenLed, true, false, &policy).await;
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn should_read_once_when_attempts_is_zero() {
        let mut pin = ScriptedPin::reading(&[Ok(false), Ok(true)]);
        let policy = VerifyPolicy {
            settle: Duration::ZERO,
            attempts: 0,
        };
        let result = actuate(&mut pin, ActuatorGroup::Fan, true, false, &policy).await;
        assert!(!result.is_success());
        assert_eq!(pin.reads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_fail_with_previous_level_when_write_errors() {
        let mut pin = ScriptedPin {
            fail_write: true,
            ..ScriptedPin::default()
        };
        let result = actuate(&mut pin, ActuatorGroup::Fan, true, false, &VerifyPolicy::default()).await;
        assert_eq!(result.outcome, ActuationOutcome::Failed);
        assert_eq!(result.observed, Mode::Off);
    }

    #[tokio::test]
    async fn should_fail_even_when_previous_level_equals_command_on_read_error() {
        let mut pin = ScriptedPin::reading(&[Err(())]);
        let result = actuate(&mut pin, ActuatorGroup::RedLed, false, false, &VerifyPolicy::default()).await;
        assert_eq!(result.outcome, ActuationOutcome::Failed);
        assert_eq!(result.observed, Mode::Off);
    }

    #[test]
    fn should_observe_without_writing() {
        let pin = ScriptedPin::reading(&[Ok(true)]);
        let result = observe(&pin, ActuatorGroup::Dehumidifier, false);
        assert_eq!(result.outcome, ActuationOutcome::Failed);
        assert_eq!(result.observed, Mode::On);
        assert!(pin.writes.lock().unwrap().is_empty());
    }

    #[test]
    fn should_list_owned_groups_in_reporting_order() {
        let bank = ActuatorBank::new()
            .with_pin(ActuatorGroup::Fan, ScriptedPin::default())
            .with_pin(ActuatorGroup::Dehumidifier, ScriptedPin::default());
        let groups: Vec<_> = bank.groups().collect();
        assert_eq!(groups, vec![ActuatorGroup::Dehumidifier, ActuatorGroup::Fan]);
        assert!(bank.owns(ActuatorGroup::Fan));
        assert!(!bank.owns(ActuatorGroup::RedLed));
    }
}
