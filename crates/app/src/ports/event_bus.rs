//! Bus port: topic-addressed publish/subscribe between processes.

use std::future::Future;

use tokio::sync::mpsc;

use dehum_domain::error::DehumError;
use dehum_domain::message::BusMessage;

/// Messages matching one subscription, in publish order.
pub type Subscription = mpsc::Receiver<BusMessage>;

/// Publishes messages to every subscriber whose prefix matches the topic.
pub trait BusPublisher {
    /// Publish a message. Succeeds even when nobody is listening.
    fn publish(&self, message: BusMessage) -> impl Future<Output = Result<(), DehumError>> + Send;
}

/// Opens subscriptions on a topic prefix.
pub trait BusSubscriber {
    /// Subscribe to every topic starting with `prefix`.
    ///
    /// Only messages published after the call are delivered.
    fn subscribe(
        &self,
        prefix: &str,
    ) -> impl Future<Output = Result<Subscription, DehumError>> + Send;
}

impl<T: BusPublisher + Send + Sync> BusPublisher for std::sync::Arc<T> {
    fn publish(&self, message: BusMessage) -> impl Future<Output = Result<(), DehumError>> + Send {
        (**self).publish(message)
    }
}

impl<T: BusSubscriber + Send + Sync> BusSubscriber for std::sync::Arc<T> {
    fn subscribe(
        &self,
        prefix: &str,
    ) -> impl Future<Output = Result<Subscription, DehumError>> + Send {
        (**self).subscribe(prefix)
    }
}
