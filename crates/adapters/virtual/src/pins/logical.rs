//! Logical-only output: no feedback wiring, so a read returns the last write.

use dehum_app::ports::ActuatorIo;
use dehum_domain::error::DehumError;

/// Output with no paired input. Every actuation verifies.
#[derive(Debug, Default)]
pub struct LogicalPin {
    level: bool,
}

impl LogicalPin {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActuatorIo for LogicalPin {
    fn set_level(&mut self, high: bool) -> Result<(), DehumError> {
        self.level = high;
        Ok(())
    }

    fn read_level(&self) -> Result<bool, DehumError> {
        Ok(self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_start_low() {
        assert!(!LogicalPin::new().read_level().unwrap());
    }

    #[test]
    fn should_read_back_last_write() {
        let mut pin = LogicalPin::new();
        pin.set_level(true).unwrap();
        assert!(pin.read_level().unwrap());
        pin.set_level(false).unwrap();
        assert!(!pin.read_level().unwrap());
    }
}
