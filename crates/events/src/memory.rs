//! In-process bus backed by `tokio::sync::broadcast` channels.
//!
//! One broadcast channel per topic plus plain queues for durable lists.
//! Suitable for a single-process deployment and for tests; an outage can be
//! simulated with [`InMemoryBus::set_available`].

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::bus::{BusError, BusMessage, MessageBus, SUBSCRIPTION_BUFFER};

/// Default buffer capacity of each topic's broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// Process-local [`MessageBus`].
pub struct InMemoryBus {
    capacity: usize,
    topics: Mutex<HashMap<String, broadcast::Sender<String>>>,
    lists: Mutex<HashMap<String, VecDeque<String>>>,
    available: AtomicBool,
    /// Forwarding tasks currently feeding a subscriber.
    live: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

/// Counts one forwarding task as live until dropped.
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn new(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(live))
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InMemoryBus {
    /// Create a bus whose topic channels buffer `capacity` messages.
    ///
    /// Slow subscribers that fall further behind skip the oldest messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            topics: Mutex::new(HashMap::new()),
            lists: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            live: Arc::new(AtomicUsize::new(0)),
            cancel: CancellationToken::new(),
        }
    }

    /// Simulate the broker going away (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Take everything queued on `list`, oldest first.
    pub async fn drain_list(&self, list: &str) -> Vec<String> {
        self.lists
            .lock()
            .await
            .get_mut(list)
            .map(|q| q.drain(..).collect())
            .unwrap_or_default()
    }

    fn ensure_available(&self) -> Result<(), BusError> {
        if self.available.load(Ordering::SeqCst) && !self.cancel.is_cancelled() {
            Ok(())
        } else {
            Err(BusError::Transport("in-memory bus unavailable".into()))
        }
    }

    async fn sender(&self, topic: &str) -> broadcast::Sender<String> {
        self.topics
            .lock()
            .await
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError> {
        self.ensure_available()?;
        // A send error only means nobody is subscribed; topics have no replay.
        let _ = self.sender(topic).await.send(payload.to_string());
        Ok(())
    }

    async fn push(&self, list: &str, payload: &str) -> Result<(), BusError> {
        self.ensure_available()?;
        self.lists
            .lock()
            .await
            .entry(list.to_string())
            .or_default()
            .push_back(payload.to_string());
        Ok(())
    }

    async fn subscribe(&self, topics: &[String]) -> Result<mpsc::Receiver<BusMessage>, BusError> {
        self.ensure_available()?;
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);

        for topic in topics {
            let mut receiver = self.sender(topic).await.subscribe();
            let tx = tx.clone();
            let topic = topic.clone();
            let cancel = self.cancel.clone();
            let guard = LiveGuard::new(&self.live);

            tokio::spawn(async move {
                let _guard = guard;
                loop {
                    let payload = tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tx.closed() => break,
                        received = receiver.recv() => match received {
                            Ok(payload) => payload,
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                tracing::warn!(topic = %topic, skipped = n, "In-memory subscriber lagged");
                                continue;
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        },
                    };
                    let message = BusMessage {
                        topic: topic.clone(),
                        payload,
                    };
                    if tx.send(message).await.is_err() {
                        break;
                    }
                }
                tracing::debug!(topic = %topic, "In-memory subscription ended");
            });
        }

        Ok(rx)
    }

    /// True while at least one subscriber is being fed and the bus is up.
    fn is_subscribed(&self) -> bool {
        self.live.load(Ordering::SeqCst) > 0 && self.ensure_available().is_ok()
    }

    fn close(&self) {
        self.cancel.cancel();
    }
}
