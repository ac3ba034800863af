//! In-process event bus backed by a tokio broadcast channel.
//!
//! Used when the gateway and relays share one process (standalone mode and
//! tests). Cross-process deployments use the MQTT adapter instead.

use std::future::Future;

use tokio::sync::{broadcast, mpsc};

use dehum_domain::error::DehumError;
use dehum_domain::message::{BusMessage, topic_matches};

use crate::ports::{BusPublisher, BusSubscriber, Subscription};

/// In-process bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the message is simply dropped). Each subscription gets its own
/// forwarding task that filters on the topic prefix.
#[derive(Clone)]
pub struct InProcessBus {
    sender: broadcast::Sender<BusMessage>,
    capacity: usize,
}

impl InProcessBus {
    /// Create a new bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }
}

impl BusPublisher for InProcessBus {
    fn publish(&self, message: BusMessage) -> impl Future<Output = Result<(), DehumError>> + Send {
        tracing::trace!(topic = %message.topic, "bus publish");
        // broadcast::send fails only when there are zero receivers,
        // which is fine, so the error is ignored.
        let _ = self.sender.send(message);
        async { Ok(()) }
    }
}

impl BusSubscriber for InProcessBus {
    fn subscribe(
        &self,
        prefix: &str,
    ) -> impl Future<Output = Result<Subscription, DehumError>> + Send {
        // Register with the broadcast channel now so nothing published after
        // this call is missed.
        let mut source = self.sender.subscribe();
        let (tx, rx) = mpsc::channel(self.capacity);
        let prefix = prefix.to_string();

        tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(message) => {
                        if topic_matches(&prefix, &message.topic) && tx.send(message).await.is_err()
                        {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(%prefix, skipped, "bus subscriber lagged, messages dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        async { Ok(rx) }
    }
}
