//! sysfs GPIO adapter error types.

use std::path::PathBuf;

use dehum_domain::error::DehumError;

/// Errors raised while talking to `/sys/class/gpio`.
#[derive(Debug, thiserror::Error)]
pub enum GpioError {
    /// A sysfs attribute could not be read or written.
    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A `value` attribute held something other than `0` or `1`.
    #[error("unexpected GPIO value {value:?} in {}", path.display())]
    InvalidValue { path: PathBuf, value: String },
}

impl GpioError {
    /// Convert into a [`DehumError::Actuator`] for propagation across port
    /// boundaries.
    #[must_use]
    pub fn into_domain(self) -> DehumError {
        DehumError::Actuator(Box::new(self))
    }
}

impl From<GpioError> for DehumError {
    fn from(err: GpioError) -> Self {
        err.into_domain()
    }
}
