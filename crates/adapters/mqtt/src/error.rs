//! MQTT adapter error types.

use dehum_domain::error::DehumError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The rumqttc client rejected a request, usually because its event
    /// loop has stopped.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),

    /// The client request queue is full, typically because the broker has
    /// been unreachable for a while.
    #[error("MQTT request queue full")]
    QueueFull,

    /// The subscription was given an empty topic prefix.
    #[error("MQTT subscription prefix must not be empty")]
    EmptyPrefix,
}

impl MqttError {
    /// Convert into a [`DehumError::Bus`] for propagation across port
    /// boundaries.
    #[must_use]
    pub fn into_domain(self) -> DehumError {
        DehumError::Bus(Box::new(self))
    }
}

impl From<MqttError> for DehumError {
    fn from(err: MqttError) -> Self {
        err.into_domain()
    }
}

impl From<rumqttc::ClientError> for MqttError {
    fn from(err: rumqttc::ClientError) -> Self {
        match err {
            rumqttc::ClientError::TryRequest(_) => Self::QueueFull,
            other => Self::Client(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_empty_prefix_error() {
        let err = MqttError::EmptyPrefix;
        assert_eq!(err.to_string(), "MQTT subscription prefix must not be empty");
    }

    #[test]
    fn should_display_queue_full_error() {
        assert_eq!(MqttError::QueueFull.to_string(), "MQTT request queue full");
    }

    #[test]
    fn should_convert_to_bus_error() {
        let err: DehumError = MqttError::EmptyPrefix.into();
        assert!(matches!(err, DehumError::Bus(_)));
    }
}
