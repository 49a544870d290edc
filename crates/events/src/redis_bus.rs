//! Redis-backed bus: `PUBLISH`/`SUBSCRIBE` for topics, `RPUSH` for the
//! durable work list.
//!
//! Pub/sub is not durable; messages published while the subscription is
//! down are lost. The work list is, which is why job submission goes
//! through [`MessageBus::push`] rather than a topic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::bus::{BusError, BusMessage, MessageBus, SUBSCRIPTION_BUFFER};
use crate::reconnect::{retry_with_backoff, ReconnectConfig};

/// Upper bound on establishing a broker connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

fn transport(context: &str, err: impl std::fmt::Display) -> BusError {
    BusError::Transport(format!("{context}: {err}"))
}

/// [`MessageBus`] over a Redis server.
///
/// `PUBLISH` and `RPUSH` share one multiplexed connection, opened on first
/// use and reopened after a command fails.
#[derive(Debug)]
pub struct RedisBus {
    client: redis::Client,
    conn: Mutex<Option<MultiplexedConnection>>,
    reconnect: ReconnectConfig,
    subscribed: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl RedisBus {
    /// Parse `redis_url`. No connection is made until first use.
    pub fn new(redis_url: &str) -> Result<Self, BusError> {
        let client = redis::Client::open(redis_url).map_err(|e| transport("invalid Redis URL", e))?;
        Ok(Self {
            client,
            conn: Mutex::new(None),
            reconnect: ReconnectConfig::default(),
            subscribed: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
        })
    }

    /// Override the backoff used when a subscription drops.
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// The shared command connection, opening it if none is cached.
    async fn connection(&self) -> Result<MultiplexedConnection, BusError> {
        let mut cached = self.conn.lock().await;
        if let Some(conn) = cached.as_ref() {
            return Ok(conn.clone());
        }

        let conn = tokio::time::timeout(CONNECT_TIMEOUT, self.client.get_multiplexed_async_connection())
            .await
            .map_err(|_| BusError::Transport("Redis connect timed out".into()))?
            .map_err(|e| transport("Redis connection failed", e))?;
        tracing::debug!("Opened Redis command connection");
        *cached = Some(conn.clone());
        Ok(conn)
    }

    /// Run `cmd key payload` on the shared connection. A failed command
    /// drops the cached connection so the next call reconnects.
    async fn command(&self, cmd: &str, key: &str, payload: &str) -> Result<(), BusError> {
        let mut conn = self.connection().await?;
        let result: redis::RedisResult<i64> = redis::cmd(cmd)
            .arg(key)
            .arg(payload)
            .query_async(&mut conn)
            .await;

        if let Err(e) = result {
            self.conn.lock().await.take();
            return Err(transport(&format!("Redis {cmd} failed"), e));
        }
        Ok(())
    }
}

/// Open a pub/sub connection subscribed to every topic.
async fn open_pubsub(client: &redis::Client, topics: &[String]) -> Result<redis::aio::PubSub, BusError> {
    let mut pubsub = tokio::time::timeout(CONNECT_TIMEOUT, client.get_async_pubsub())
        .await
        .map_err(|_| BusError::Transport("Redis connect timed out".into()))?
        .map_err(|e| transport("Redis pub/sub connection failed", e))?;

    for topic in topics {
        pubsub
            .subscribe(topic.as_str())
            .await
            .map_err(|e| transport("Redis SUBSCRIBE failed", e))?;
    }
    Ok(pubsub)
}

/// Forward pub/sub messages into `tx`, reconnecting whenever the broker
/// drops the subscription. Ends on cancellation or when `tx` is closed.
async fn forward_messages(
    client: redis::Client,
    topics: Vec<String>,
    initial: redis::aio::PubSub,
    tx: mpsc::Sender<BusMessage>,
    reconnect: ReconnectConfig,
    subscribed: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    let mut next = Some(initial);

    loop {
        let pubsub = match next.take() {
            Some(pubsub) => pubsub,
            None => {
                let reconnected = retry_with_backoff("redis", &reconnect, &cancel, || {
                    open_pubsub(&client, &topics)
                })
                .await;
                match reconnected {
                    Some(pubsub) => pubsub,
                    None => break,
                }
            }
        };

        subscribed.store(true, Ordering::SeqCst);
        tracing::info!(topics = ?topics, "Bus subscription live");
        let mut stream = pubsub.into_on_message();

        loop {
            let msg = tokio::select! {
                _ = cancel.cancelled() => {
                    subscribed.store(false, Ordering::SeqCst);
                    return;
                }
                msg = stream.next() => msg,
            };

            let Some(msg) = msg else {
                break;
            };

            let payload: String = match msg.get_payload() {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping non-text bus payload");
                    continue;
                }
            };
            let message = BusMessage {
                topic: msg.get_channel_name().to_string(),
                payload,
            };
            if tx.send(message).await.is_err() {
                tracing::debug!("Bus consumer gone, ending subscription");
                subscribed.store(false, Ordering::SeqCst);
                return;
            }
        }

        subscribed.store(false, Ordering::SeqCst);
        tracing::warn!("Bus subscription dropped; live relay degraded until reconnect");
    }

    subscribed.store(false, Ordering::SeqCst);
}

#[async_trait]
impl MessageBus for RedisBus {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError> {
        self.command("PUBLISH", topic, payload).await
    }

    async fn push(&self, list: &str, payload: &str) -> Result<(), BusError> {
        self.command("RPUSH", list, payload).await
    }

    async fn subscribe(&self, topics: &[String]) -> Result<mpsc::Receiver<BusMessage>, BusError> {
        let pubsub = open_pubsub(&self.client, topics).await?;
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);

        tokio::spawn(forward_messages(
            self.client.clone(),
            topics.to_vec(),
            pubsub,
            tx,
            self.reconnect.clone(),
            Arc::clone(&self.subscribed),
            self.cancel.child_token(),
        ));

        Ok(rx)
    }

    fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.cancel.cancel();
    }
}
