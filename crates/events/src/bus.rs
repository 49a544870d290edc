//! Transport contract shared by every bus backend.

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Buffer between a bus subscription task and its consumer.
pub const SUBSCRIPTION_BUFFER: usize = 1024;

/// Errors raised by the bus transport. No operation retries internally.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BusError {
    /// The broker is unreachable or refused the command.
    #[error("Bus transport error: {0}")]
    Transport(String),
}

/// A raw message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: String,
}

/// Publish/subscribe over topics plus push onto durable lists.
///
/// Topics are ephemeral broadcasts without replay. Lists survive the
/// absence of a consumer and are only ever pushed to from this system.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Fire-and-forget broadcast on `topic`.
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError>;

    /// Append `payload` to the durable list `list`.
    async fn push(&self, list: &str, payload: &str) -> Result<(), BusError>;

    /// Subscribe to `topics`.
    ///
    /// A dedicated task owns the broker subscription and feeds the returned
    /// channel, preserving per-topic broker order. The channel closes when
    /// the bus is closed; a backend may keep it open across reconnects.
    async fn subscribe(&self, topics: &[String]) -> Result<mpsc::Receiver<BusMessage>, BusError>;

    /// Whether a topic subscription is currently live.
    fn is_subscribed(&self) -> bool;

    /// Stop every subscription task. Terminal.
    fn close(&self);
}
