use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::Message;
use tokio::sync::{mpsc, RwLock};

use crate::ws::observer::{ConnId, WsObserver, OUTBOUND_BUFFER};

/// The set of all live WebSocket connections.
///
/// Only used for aggregate stats, heartbeats and shutdown; per-job delivery
/// goes through the [`SubscriptionRegistry`](crate::ws::SubscriptionRegistry).
pub struct WsManager {
    connections: RwLock<HashMap<ConnId, Arc<WsObserver>>>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the observer handle plus the receiver half of its message
    /// channel so the caller can forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: ConnId) -> (Arc<WsObserver>, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        let observer = Arc::new(WsObserver::new(conn_id.clone(), tx));
        self.connections
            .write()
            .await
            .insert(conn_id, Arc::clone(&observer));
        (observer, rx)
    }

    /// Remove a connection by its ID.
    pub async fn remove(&self, conn_id: &str) -> Option<Arc<WsObserver>> {
        self.connections.write().await.remove(conn_id)
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the set.
    ///
    /// Each connection's own cleanup still runs when its socket ends.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            conn.send_control(Message::Close(None));
            conn.close();
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            conn.send_control(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
