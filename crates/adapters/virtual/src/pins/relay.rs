//! Simulated relay contact with an injectable feedback fault.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dehum_app::ports::ActuatorIo;
use dehum_domain::error::DehumError;

/// How the simulated feedback input misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fault {
    /// Feedback follows the output.
    #[default]
    Healthy,
    /// Feedback is pinned to one level, as with a welded contact.
    StuckAt(bool),
    /// Feedback reports the opposite of the output.
    Inverted,
    /// Every read and write fails.
    Disconnected,
}

/// Errors raised by a [`VirtualPin`].
#[derive(Debug, thiserror::Error)]
pub enum VirtualPinError {
    #[error("virtual pin disconnected")]
    Disconnected,
}

impl From<VirtualPinError> for DehumError {
    fn from(err: VirtualPinError) -> Self {
        DehumError::Actuator(Box::new(err))
    }
}

#[derive(Debug, Default)]
struct PinState {
    output: bool,
    fault: Fault,
    writes: usize,
}

/// A simulated output/feedback pair.
///
/// State lives behind a shared lock so a [`VirtualProbe`] can inspect it or
/// inject faults after the pin has been handed to a relay.
#[derive(Debug, Default)]
pub struct VirtualPin {
    state: Arc<Mutex<PinState>>,
}

impl VirtualPin {
    /// A healthy pin with the output low.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A pin that starts with `fault` already injected.
    #[must_use]
    pub fn with_fault(fault: Fault) -> Self {
        let pin = Self::new();
        pin.probe().set_fault(fault);
        pin
    }

    /// A handle sharing this pin's state.
    #[must_use]
    pub fn probe(&self) -> VirtualProbe {
        VirtualProbe {
            state: Arc::clone(&self.state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PinState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ActuatorIo for VirtualPin {
    fn set_level(&mut self, high: bool) -> Result<(), DehumError> {
        let mut state = self.lock();
        if state.fault == Fault::Disconnected {
            return Err(VirtualPinError::Disconnected.into());
        }
        state.output = high;
        state.writes += 1;
        tracing::trace!(high, "virtual output written");
        Ok(())
    }

    fn read_level(&self) -> Result<bool, DehumError> {
        let state = self.lock();
        match state.fault {
            Fault::Healthy => Ok(state.output),
            Fault::StuckAt(level) => Ok(level),
            Fault::Inverted => Ok(!state.output),
            Fault::Disconnected => Err(VirtualPinError::Disconnected.into()),
        }
    }
}

/// Observer and fault injector for a [`VirtualPin`].
#[derive(Debug, Clone)]
pub struct VirtualProbe {
    state: Arc<Mutex<PinState>>,
}

impl VirtualProbe {
    /// Level last written to the output.
    #[must_use]
    pub fn output(&self) -> bool {
        self.lock().output
    }

    /// Number of successful writes so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    pub fn set_fault(&self, fault: Fault) {
        self.lock().fault = fault;
    }

    /// Force the output level without counting a write, as if someone
    /// flipped the relay by hand.
    pub fn force_output(&self, high: bool) {
        self.lock().output = high;
    }

    fn lock(&self) -> MutexGuard<'_, PinState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
