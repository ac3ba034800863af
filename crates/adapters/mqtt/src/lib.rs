//! # dehum-adapter-mqtt
//!
//! MQTT bus adapter: lets the gateway and relays run as separate processes.
//!
//! ## Responsibilities
//! - Connect to an MQTT broker with `rumqttc` and keep its event loop running
//! - Publish [`BusMessage`]s verbatim (topic as-is, JSON payload as-is)
//! - Map prefix subscriptions onto MQTT topic filters and route incoming
//!   publishes to every matching subscription
//!
//! ## Dependency rule
//! Same as other adapters: depends on `dehum-app` and `dehum-domain`.

pub mod config;
pub mod error;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use dehum_app::ports::{BusPublisher, BusSubscriber, Subscription};
use dehum_domain::error::DehumError;
use dehum_domain::message::{BusMessage, topic_matches};

pub use config::MqttConfig;
pub use error::MqttError;

/// Bus backed by an MQTT broker.
///
/// Cloning shares the same connection and subscriptions.
#[derive(Clone)]
pub struct MqttBus {
    client: AsyncClient,
    routes: Arc<Routes>,
    capacity: usize,
}

impl MqttBus {
    /// Create the client and spawn the task driving its event loop.
    ///
    /// The connection is established lazily by that task and retried after
    /// every error, so this never fails.
    #[must_use]
    pub fn connect(config: &MqttConfig) -> (Self, JoinHandle<()>) {
        let mut options = MqttOptions::new(
            config.client_id.clone(),
            config.broker_host.clone(),
            config.broker_port,
        );
        options.set_keep_alive(config.keep_alive());

        let capacity = config.capacity.max(1);
        let (client, eventloop) = AsyncClient::new(options, capacity);
        let routes = Arc::new(Routes::default());

        tracing::info!(
            host = %config.broker_host,
            port = config.broker_port,
            client_id = %config.client_id,
            "connecting to MQTT broker"
        );
        let task = tokio::spawn(drive(
            eventloop,
            client.clone(),
            Arc::clone(&routes),
            config.reconnect_delay(),
        ));

        (
            Self {
                client,
                routes,
                capacity,
            },
            task,
        )
    }
}

impl BusPublisher for MqttBus {
    /// Queue `message` for the event loop without waiting for room.
    ///
    /// While the broker is unreachable the queue is not drained, so once it
    /// holds `capacity` requests further publishes fail with
    /// [`MqttError::QueueFull`] instead of stalling the caller.
    async fn publish(&self, message: BusMessage) -> Result<(), DehumError> {
        tracing::trace!(topic = %message.topic, "MQTT publish");
        self.client
            .try_publish(message.topic, QoS::AtLeastOnce, false, message.payload)
            .map_err(MqttError::from)?;
        Ok(())
    }
}

impl BusSubscriber for MqttBus {
    async fn subscribe(&self, prefix: &str) -> Result<Subscription, DehumError> {
        if prefix.is_empty() {
            return Err(MqttError::EmptyPrefix.into());
        }
        let subscription = self.routes.add(prefix, self.capacity);
        self.client
            .try_subscribe(topic_filter(prefix), QoS::AtLeastOnce)
            .map_err(MqttError::from)?;
        tracing::debug!(%prefix, "MQTT subscription registered");
        Ok(subscription)
    }
}

async fn drive(
    mut eventloop: EventLoop,
    client: AsyncClient,
    routes: Arc<Routes>,
    reconnect_delay: Duration,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!("connected to MQTT broker");
                // A clean session forgets subscriptions across reconnects.
                for prefix in routes.prefixes() {
                    if let Err(err) = client.try_subscribe(topic_filter(&prefix), QoS::AtLeastOnce) {
                        tracing::warn!(%prefix, error = %err, "failed to renew MQTT subscription");
                    }
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                routes.dispatch(&BusMessage {
                    topic: publish.topic.clone(),
                    payload: publish.payload.to_vec(),
                });
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "MQTT connection error, retrying");
                tokio::time::sleep(reconnect_delay).await;
            }
        }
    }
}

/// MQTT filter covering `prefix` and every topic below it.
fn topic_filter(prefix: &str) -> String {
    format!("{}/#", prefix.trim_end_matches('/'))
}

struct Route {
    prefix: String,
    sender: mpsc::Sender<BusMessage>,
}

/// Local prefix subscriptions sharing one MQTT connection.
#[derive(Default)]
struct Routes {
    inner: Mutex<Vec<Route>>,
}

impl Routes {
    fn add(&self, prefix: &str, capacity: usize) -> Subscription {
        let (sender, receiver) = mpsc::channel(capacity);
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Route {
                prefix: prefix.to_string(),
                sender,
            });
        receiver
    }

    fn prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|route| route.prefix.clone())
            .collect();
        prefixes.sort();
        prefixes.dedup();
        prefixes
    }

    /// Hand `message` to every matching subscription without waiting.
    ///
    /// Blocking here would stall the event loop, so a full subscription
    /// drops the message. Closed subscriptions are forgotten.
    fn dispatch(&self, message: &BusMessage) {
        let mut routes = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        routes.retain(|route| !route.sender.is_closed());
        for route in routes.iter() {
            if !topic_matches(&route.prefix, &message.topic) {
                continue;
            }
            if let Err(mpsc::error::TrySendError::Full(_)) = route.sender.try_send(message.clone()) {
                tracing::warn!(prefix = %route.prefix, topic = %message.topic, "subscriber full, message dropped");
            }
        }
    }
}
