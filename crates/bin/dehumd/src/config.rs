//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `dehum.toml` in the working directory, or the file named by
//! `DEHUM_CONFIG`. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use dehum_adapter_mqtt::MqttConfig;
use dehum_app::services::actuation::VerifyPolicy;
use dehum_app::services::gateway_service::{DEFAULT_INITIAL_STATE, GatewayConfig};
use dehum_domain::group::ActuatorGroup;

const DEFAULT_CONFIG_PATH: &str = "dehum.toml";

/// Top-level configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which components this process runs.
    pub mode: Mode,
    /// Operator-facing gateway settings.
    pub gateway: GatewaySection,
    /// Broker settings, used in `gateway` and `relay` modes.
    pub mqtt: MqttConfig,
    /// Read-back verification after each write.
    pub verify: VerifySection,
    /// Relays run by this process.
    pub relays: Vec<RelayConfig>,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Process role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Operator sessions only; publishes over MQTT.
    Gateway,
    /// Actuator relays only; subscribes over MQTT.
    Relay,
    /// Gateway and relays in one process on the in-process bus.
    #[default]
    Standalone,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gateway => "gateway",
            Self::Relay => "relay",
            Self::Standalone => "standalone",
        })
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gateway" => Ok(Self::Gateway),
            "relay" => Ok(Self::Relay),
            "standalone" => Ok(Self::Standalone),
            other => Err(ConfigError::Validation(format!("unknown mode {other:?}"))),
        }
    }
}

/// Gateway listener and behaviour.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    /// IP address to bind to.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Pending-connection queue length.
    pub backlog: u32,
    /// Label shown before the first command.
    pub initial_state: String,
    /// Whether `status` is accepted.
    pub status_enabled: bool,
}

/// Verification timing.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct VerifySection {
    /// Delay between a write and each read-back, in milliseconds.
    pub settle_ms: u64,
    /// Reads before declaring a mismatch.
    pub attempts: u32,
}

/// One relay and the groups it owns.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Name used for the `<name>/status` topic.
    pub name: String,
    pub dehumidifier: Option<PinConfig>,
    pub fan: Option<PinConfig>,
    pub green_led: Option<PinConfig>,
    pub red_led: Option<PinConfig>,
}

/// How a group's output and feedback are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PinConfig {
    /// Linux sysfs GPIO output and input numbers.
    Sysfs { output: u32, input: u32 },
    /// Simulated relay contact.
    Virtual,
    /// No feedback wiring.
    Logical,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `dehum.toml` (or `DEHUM_CONFIG`) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is malformed, an override is
    /// unparsable, or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let lookup = |key: &str| std::env::var(key).ok();
        let path = lookup("DEHUM_CONFIG").unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("DEHUM_MODE") {
            self.mode = val.parse()?;
        }
        if let Some(val) = lookup("DEHUM_HOST") {
            self.gateway.host = val;
        }
        if let Some(port) = lookup("DEHUM_PORT").and_then(|val| val.parse().ok()) {
            self.gateway.port = port;
        }
        if let Some(val) = lookup("DEHUM_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.gateway.host = host.trim_start_matches('[').trim_end_matches(']').to_string();
                if let Ok(port) = port.parse() {
                    self.gateway.port = port;
                }
            }
        }
        if let Some(val) = lookup("DEHUM_MQTT_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Some(port) = lookup("DEHUM_MQTT_PORT").and_then(|val| val.parse().ok()) {
            self.mqtt.broker_port = port;
        }
        if let Some(val) = lookup("DEHUM_MQTT_CLIENT_ID") {
            self.mqtt.client_id = val;
        }
        if let Some(val) = lookup("DEHUM_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Validation(msg));

        if self.gateway.port == 0 {
            return invalid("port must be non-zero".to_string());
        }
        if self.gateway.backlog == 0 {
            return invalid("backlog must be at least 1".to_string());
        }
        if self.gateway.host.parse::<IpAddr>().is_err() {
            return invalid(format!("gateway host {:?} is not an IP address", self.gateway.host));
        }
        if self.verify.attempts == 0 {
            return invalid("verify attempts must be at least 1".to_string());
        }
        if self.mode != Mode::Gateway && self.relays.is_empty() {
            return invalid(format!("{} mode needs at least one relay", self.mode));
        }

        let mut owners: BTreeMap<ActuatorGroup, &str> = BTreeMap::new();
        for relay in &self.relays {
            if relay.name.trim().is_empty() {
                return invalid("relay name must not be empty".to_string());
            }
            if self.relays.iter().filter(|r| r.name == relay.name).count() > 1 {
                return invalid(format!("relay {:?} is defined twice", relay.name));
            }
            if relay.pins().next().is_none() {
                return invalid(format!("relay {:?} owns no actuator group", relay.name));
            }
            for (group, _) in relay.pins() {
                if let Some(other) = owners.insert(group, &relay.name) {
                    return invalid(format!(
                        "{group} is owned by both {other:?} and {:?}",
                        relay.name
                    ));
                }
            }
        }
        Ok(())
    }

    /// Return the gateway's listening address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the host is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.gateway.host.parse().map_err(|_| {
            ConfigError::Validation(format!(
                "gateway host {:?} is not an IP address",
                self.gateway.host
            ))
        })?;
        Ok(SocketAddr::new(ip, self.gateway.port))
    }

    #[must_use]
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            initial_state: self.gateway.initial_state.clone(),
            status_enabled: self.gateway.status_enabled,
        }
    }

    /// Broker settings with the client id qualified by the mode.
    ///
    /// A broker evicts the older of two sessions sharing an id, so a
    /// gateway and a relay started from the same file must not collide.
    #[must_use]
    pub fn mqtt_config(&self) -> MqttConfig {
        MqttConfig {
            client_id: format!("{}-{}", self.mqtt.client_id, self.mode),
            ..self.mqtt.clone()
        }
    }

    #[must_use]
    pub fn verify_policy(&self) -> VerifyPolicy {
        VerifyPolicy {
            settle: Duration::from_millis(self.verify.settle_ms),
            attempts: self.verify.attempts,
        }
    }
}

impl RelayConfig {
    /// Owned groups with their wiring, in reporting order.
    pub fn pins(&self) -> impl Iterator<Item = (ActuatorGroup, PinConfig)> + '_ {
        [
            (ActuatorGroup::Dehumidifier, self.dehumidifier),
            (ActuatorGroup::Fan, self.fan),
            (ActuatorGroup::GreenLed, self.green_led),
            (ActuatorGroup::RedLed, self.red_led),
        ]
        .into_iter()
        .filter_map(|(group, pin)| pin.map(|pin| (group, pin)))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            gateway: GatewaySection::default(),
            mqtt: MqttConfig::default(),
            verify: VerifySection::default(),
            relays: default_relays(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7575,
            backlog: 16,
            initial_state: DEFAULT_INITIAL_STATE.to_string(),
            status_enabled: true,
        }
    }
}

impl Default for VerifySection {
    fn default() -> Self {
        Self {
            settle_ms: 0,
            attempts: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "dehumd=info,dehum_app=info,dehum_adapter_session_tcp=info,dehum_adapter_mqtt=info"
                .to_string(),
        }
    }
}

/// The two relays of the original deployment, on simulated pins.
fn default_relays() -> Vec<RelayConfig> {
    vec![
        RelayConfig {
            name: "dhcontrol".to_string(),
            dehumidifier: Some(PinConfig::Virtual),
            fan: Some(PinConfig::Virtual),
            ..RelayConfig::default()
        },
        RelayConfig {
            name: "LEDcontrol".to_string(),
            green_led: Some(PinConfig::Virtual),
            red_led: Some(PinConfig::Virtual),
            ..RelayConfig::default()
        },
    ]
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
