//! MQTT bus configuration.

use std::time::Duration;

use serde::Deserialize;

/// Connection settings for the MQTT bus.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier. Must be unique per process on one broker.
    pub client_id: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Delay before polling again after a connection error, in seconds.
    pub reconnect_secs: u16,
    /// Buffered messages per subscription and in the client request queue.
    pub capacity: usize,
}

impl MqttConfig {
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(u64::from(self.keep_alive_secs))
    }

    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(u64::from(self.reconnect_secs))
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "dehumd".to_string(),
            keep_alive_secs: 30,
            reconnect_secs: 5,
            capacity: 64,
        }
    }
}
