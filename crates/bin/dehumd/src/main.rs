//! # dehumd: dehum daemon
//!
//! Composition root that wires adapters together and runs the gateway,
//! the relays, or both.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Initialise `tracing` logging
//! - Pick the bus: in-process for `standalone`, MQTT for `gateway` and `relay`
//! - Open the pins each relay owns and spawn one task per relay
//! - Announce the initial state, spawn the gateway dispatcher and serve
//!   operator sessions
//! - Handle graceful shutdown (Ctrl-C)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use dehum_adapter_gpio_sysfs::{GpioError, SysfsGpioPin};
use dehum_adapter_mqtt::MqttBus;
use dehum_adapter_session_tcp::{SessionError, SessionServer};
use dehum_adapter_virtual::{LogicalPin, VirtualPin};
use dehum_app::event_bus::InProcessBus;
use dehum_app::ports::{ActuatorIo, BusPublisher, BusSubscriber};
use dehum_app::services::actuation::{ActuatorBank, VerifyPolicy};
use dehum_app::services::gateway_service::GatewayService;
use dehum_app::services::relay_service::RelayService;
use dehum_domain::error::DehumError;
use dehum_domain::message::STATE_TOPIC;
use tracing_subscriber::EnvFilter;

use config::{Config, ConfigError, LoggingConfig, Mode, PinConfig, RelayConfig};

const BUS_CAPACITY: usize = 256;
const DISPATCH_CAPACITY: usize = 64;

/// Failures that stop the daemon before or while it starts serving.
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to open GPIO pins for relay {relay:?}")]
    Gpio {
        relay: String,
        #[source]
        source: GpioError,
    },

    #[error("failed to initialise relay {relay:?}")]
    Relay {
        relay: String,
        #[source]
        source: DehumError,
    },

    #[error("failed to start operator sessions")]
    Session(#[from] SessionError),

    #[error("bus unavailable")]
    Bus(#[from] DehumError),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            init_tracing(&LoggingConfig::default().filter);
            tracing::error!(error = %err, "invalid configuration");
            return Err(err.into());
        }
    };
    init_tracing(&config.logging.filter);
    tracing::info!(mode = %config.mode, "dehumd starting");

    if let Err(err) = run(config).await {
        tracing::error!(error = %err, "dehumd failed");
        return Err(err.into());
    }
    tracing::info!("dehumd stopped");
    Ok(())
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(config: Config) -> Result<(), StartupError> {
    match config.mode {
        Mode::Standalone => {
            let bus = InProcessBus::new(BUS_CAPACITY);
            start_relays(&config, &bus).await?;
            run_gateway(&config, bus).await
        }
        Mode::Gateway => {
            let (bus, _connection) = MqttBus::connect(&config.mqtt_config());
            run_gateway(&config, bus).await
        }
        Mode::Relay => {
            let (bus, _connection) = MqttBus::connect(&config.mqtt_config());
            start_relays(&config, &bus).await?;
            shutdown_signal().await;
            Ok(())
        }
    }
}

async fn start_relays<B>(config: &Config, bus: &B) -> Result<(), StartupError>
where
    B: BusPublisher + BusSubscriber + Clone + Send + Sync + 'static,
{
    let policy: VerifyPolicy = config.verify_policy();
    for relay in &config.relays {
        let bank = build_bank(relay)?;
        let mut service = RelayService::new(relay.name.clone(), bus.clone(), bank, policy);
        service.initialise().map_err(|source| StartupError::Relay {
            relay: relay.name.clone(),
            source,
        })?;

        let subscription = bus.subscribe(STATE_TOPIC).await?;
        let groups: Vec<String> = relay.pins().map(|(group, _)| group.to_string()).collect();
        tracing::info!(relay = %relay.name, groups = ?groups, "relay ready");
        tokio::spawn(service.run(subscription));
    }
    Ok(())
}

fn build_bank(relay: &RelayConfig) -> Result<ActuatorBank, StartupError> {
    let mut bank = ActuatorBank::new();
    for (group, pin) in relay.pins() {
        let io: Box<dyn ActuatorIo> = match pin {
            PinConfig::Sysfs { output, input } => Box::new(
                SysfsGpioPin::open(output, input).map_err(|source| StartupError::Gpio {
                    relay: relay.name.clone(),
                    source,
                })?,
            ),
            PinConfig::Virtual => Box::new(VirtualPin::new()),
            PinConfig::Logical => Box::new(LogicalPin::new()),
        };
        bank.insert(group, io);
    }
    Ok(bank)
}

async fn run_gateway<B>(config: &Config, bus: B) -> Result<(), StartupError>
where
    B: BusPublisher + Send + Sync + 'static,
{
    let service = GatewayService::new(bus, config.gateway_config());
    service.announce().await?;

    let server = SessionServer::bind(config.bind_addr()?, config.gateway.backlog)?;
    let (handle, _dispatcher) = service.spawn(DISPATCH_CAPACITY);
    server.serve(handle, shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
