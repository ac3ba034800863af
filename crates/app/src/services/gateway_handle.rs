//! Dispatcher task owning the [`GatewayService`], and the cloneable handle
//! sessions use to reach it.
//!
//! Every line from every session goes through one channel, so each line is
//! fully handled (validated, published, state updated) before the next.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use dehum_domain::error::DehumError;

use super::gateway_service::GatewayService;
use crate::ports::BusPublisher;

const PUBLISH_FAILED: &str =
    "\n** FAILED ** - The command could not be sent. Nothing was changed.\n";

enum Request {
    Line {
        line: String,
        reply: oneshot::Sender<String>,
    },
    Prompt {
        reply: oneshot::Sender<String>,
    },
}

/// Cloneable sender side of the gateway dispatcher.
#[derive(Clone)]
pub struct GatewayHandle {
    sender: mpsc::Sender<Request>,
}

impl GatewayHandle {
    /// Submit one operator line and get back the text to write to the
    /// session: the notice followed by the next prompt.
    ///
    /// # Errors
    ///
    /// Returns [`DehumError::Closed`] if the dispatcher has stopped.
    pub async fn submit(&self, line: impl Into<String>) -> Result<String, DehumError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(Request::Line {
                line: line.into(),
                reply,
            })
            .await
            .map_err(|_| DehumError::Closed)?;
        rx.await.map_err(|_| DehumError::Closed)
    }

    /// The current prompt, for a freshly connected session.
    ///
    /// # Errors
    ///
    /// Returns [`DehumError::Closed`] if the dispatcher has stopped.
    pub async fn prompt(&self) -> Result<String, DehumError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(Request::Prompt { reply })
            .await
            .map_err(|_| DehumError::Closed)?;
        rx.await.map_err(|_| DehumError::Closed)
    }
}

impl<P> GatewayService<P>
where
    P: BusPublisher + Send + Sync + 'static,
{
    /// Move the service into its own task.
    ///
    /// The task ends once every [`GatewayHandle`] has been dropped.
    pub fn spawn(mut self, capacity: usize) -> (GatewayHandle, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel(capacity.max(1));

        let task = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                match request {
                    Request::Line { line, reply } => {
                        let notice = match self.handle_line(&line).await {
                            Ok(outcome) => outcome.text,
                            Err(err) => {
                                tracing::error!(error = %err, line = %line.trim(), "failed to publish command");
                                PUBLISH_FAILED.to_string()
                            }
                        };
                        // The session may have gone away meanwhile.
                        let _ = reply.send(notice + &self.prompt());
                    }
                    Request::Prompt { reply } => {
                        let _ = reply.send(self.prompt());
                    }
                }
            }
            tracing::debug!("gateway dispatcher stopped");
        });

        (GatewayHandle { sender }, task)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::services::gateway_service::GatewayConfig;
    use dehum_domain::message::{BusMessage, StateTransitionEvent};

    #[derive(Clone, Default)]
    struct RecordingPublisher {
        sent: Arc<Mutex<Vec<BusMessage>>>,
    }

    impl BusPublisher for RecordingPublisher {
        async fn publish(&self, message: BusMessage) -> Result<(), DehumError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    struct FailingPublisher;

    impl BusPublisher for FailingPublisher {
        async fn publish(&self, _message: BusMessage) -> Result<(), DehumError> {
            Err(DehumError::Bus("broker unreachable".into()))
        }
    }

    #[tokio::test]
    async fn should_reply_with_notice_and_prompt() {
        let (handle, _task) =
            GatewayService::new(RecordingPublisher::default(), GatewayConfig::default()).spawn(8);

        assert_eq!(
            handle.prompt().await.unwrap(),
            "\nCurrent state: all off. Enter new state: "
        );
        let text = handle.submit("shed dehum").await.unwrap();
        assert_eq!(
            text,
            "\n** SUCCESS ** - The dehumidifier is already off.\n\nCurrent state: all off. Enter new state: "
        );
    }

    #[tokio::test]
    async fn should_serialize_lines_from_cloned_handles() {
        let publisher = RecordingPublisher::default();
        let (handle, _task) =
            GatewayService::new(publisher.clone(), GatewayConfig::default()).spawn(8);
        let other = handle.clone();

        handle.submit("run dehum").await.unwrap();
        let text = other.submit("run fan").await.unwrap();

        assert!(text.contains("Turn off the dehumidifier"));
        assert!(text.ends_with("Current state: run dehum. Enter new state: "));
        let events: Vec<StateTransitionEvent> = publisher
            .sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.decode().unwrap())
            .collect();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn should_report_publish_failure_to_operator() {
        let (handle, _task) =
            GatewayService::new(FailingPublisher, GatewayConfig::default()).spawn(8);
        let text = handle.submit("run fan").await.unwrap();
        assert!(text.starts_with(PUBLISH_FAILED));
        assert!(text.ends_with("Current state: all off. Enter new state: "));
    }

    #[tokio::test]
    async fn should_stop_when_every_handle_is_dropped() {
        let (handle, task) =
            GatewayService::new(RecordingPublisher::default(), GatewayConfig::default()).spawn(8);
        drop(handle);
        task.await.unwrap();
    }
}
