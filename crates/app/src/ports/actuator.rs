//! Actuator port: one output pin and the input pin that observes it.
//!
//! Implementations differ only in whether physical pins exist: a
//! hardware-backed pair reads the real feedback, a logical-only one echoes
//! what was written.

use dehum_domain::error::DehumError;

/// Boolean-level output with paired feedback input.
///
/// Both calls are synchronous and expected to return quickly.
pub trait ActuatorIo: Send + Sync {
    /// Drive the output high (`true`) or low.
    ///
    /// # Errors
    ///
    /// Returns [`DehumError::Actuator`] if the pin cannot be written.
    fn set_level(&mut self, high: bool) -> Result<(), DehumError>;

    /// Read the current level of the feedback input.
    ///
    /// # Errors
    ///
    /// Returns [`DehumError::Actuator`] if the pin cannot be read.
    fn read_level(&self) -> Result<bool, DehumError>;
}

impl<T: ActuatorIo + ?Sized> ActuatorIo for Box<T> {
    fn set_level(&mut self, high: bool) -> Result<(), DehumError> {
        (**self).set_level(high)
    }

    fn read_level(&self) -> Result<bool, DehumError> {
        (**self).read_level()
    }
}
