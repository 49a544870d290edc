use std::sync::Arc;

use jobwire_events::{
    retry_with_backoff, BusEvent, BusMessage, MessageBus, ReconnectConfig, Topics,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::ws::{Observer, ServerMessage, SubscriptionRegistry};

/// Forwards bus events to subscribed observers.
///
/// A single relay task consumes one bus subscription. Delivery is
/// best-effort: an observer that unsubscribes while an event is in flight
/// may or may not see it, but an event is never sent to an observer of a
/// different job.
pub struct EventRelay {
    registry: Arc<SubscriptionRegistry>,
    topics: Topics,
}

impl EventRelay {
    pub fn new(registry: Arc<SubscriptionRegistry>, topics: Topics) -> Self {
        Self { registry, topics }
    }

    /// Subscribe to the relay topics and run in the background.
    ///
    /// If the bus is unreachable at startup the relay logs degraded mode
    /// and keeps retrying with `reconnect` backoff until it subscribes or
    /// `cancel` fires. Job submission is unaffected either way.
    pub fn spawn(
        self,
        bus: Arc<dyn MessageBus>,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let topics = self.topics.all();
            let receiver = match bus.subscribe(&topics).await {
                Ok(receiver) => receiver,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Bus subscription failed; live updates unavailable (degraded mode)"
                    );
                    let retried = retry_with_backoff("relay", &reconnect, &cancel, || {
                        bus.subscribe(&topics)
                    })
                    .await;
                    match retried {
                        Some(receiver) => receiver,
                        None => return,
                    }
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Event relay cancelled");
                }
                _ = self.run(receiver) => {}
            }
        })
    }

    /// Run the relay loop until the subscription channel closes.
    pub async fn run(self, mut receiver: mpsc::Receiver<BusMessage>) {
        tracing::info!(
            status_topic = %self.topics.status,
            complete_topic = %self.topics.complete,
            "Event relay started"
        );

        while let Some(message) = receiver.recv().await {
            match BusEvent::decode(&message, &self.topics) {
                Ok(Some(event)) => {
                    self.forward(&event).await;
                }
                Ok(None) => {
                    tracing::trace!(topic = %message.topic, "Ignoring message on foreign topic");
                }
                Err(e) => {
                    tracing::warn!(topic = %message.topic, error = %e, "Dropping malformed bus event");
                }
            }
        }

        tracing::warn!("Bus subscription closed; live updates unavailable (degraded mode)");
    }

    /// Send `event` to every observer of its job.
    ///
    /// Returns how many observers accepted the frame.
    pub async fn forward(&self, event: &BusEvent) -> usize {
        let job_id = event.job_id();
        let observers = self.registry.snapshot(job_id).await;
        if observers.is_empty() {
            tracing::trace!(job_id = %job_id, "No observers for event");
            return 0;
        }

        let message = match event {
            BusEvent::Status(e) => ServerMessage::Status {
                job_id: e.job_id.clone(),
                data: e.clone(),
            },
            BusEvent::Complete(e) => ServerMessage::Complete {
                job_id: e.job_id.clone(),
                data: e.clone(),
            },
        };
        let frame = match serde_json::to_string(&message) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Failed to encode relay frame");
                return 0;
            }
        };

        let delivered = observers
            .iter()
            .filter(|observer| observer.send(&frame).is_ok())
            .count();

        tracing::debug!(
            job_id = %job_id,
            observers = observers.len(),
            delivered,
            "Relayed event"
        );
        delivered
    }
}
