//! The send capability the registry and relay hold for each connection.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::ws::Message;
use tokio::sync::mpsc;

use crate::ws::protocol::ServerMessage;

/// Frames queued per connection before further frames are dropped.
pub const OUTBOUND_BUFFER: usize = 256;

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::Sender<Message>;

/// Connection identifier, unique for the life of the process.
pub type ConnId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("connection closed")]
    Closed,
    /// The outbound queue is full; the frame was dropped.
    #[error("outbound queue full")]
    Full,
}

/// Something that can receive outbound text frames.
///
/// Sends never block and never fail loudly: a closed observer returns
/// [`SendError::Closed`], a slow one [`SendError::Full`], and the caller
/// moves on.
pub trait Observer: Send + Sync {
    fn id(&self) -> &str;

    fn is_open(&self) -> bool;

    fn send(&self, frame: &str) -> Result<(), SendError>;
}

/// Serialize `message` and send it, logging rather than propagating failure.
pub fn send_message(observer: &dyn Observer, message: &ServerMessage) {
    let frame = match serde_json::to_string(message) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::error!(conn_id = %observer.id(), error = %e, "Failed to encode outbound frame");
            return;
        }
    };
    if let Err(e) = observer.send(&frame) {
        tracing::trace!(conn_id = %observer.id(), error = %e, "Dropped outbound frame");
    }
}

/// A live WebSocket connection as seen by the rest of the server.
pub struct WsObserver {
    id: ConnId,
    sender: WsSender,
    open: AtomicBool,
}

impl WsObserver {
    pub fn new(id: ConnId, sender: WsSender) -> Self {
        Self {
            id,
            sender,
            open: AtomicBool::new(true),
        }
    }

    /// Mark the connection closed. Later sends fail with [`SendError::Closed`].
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    /// Queue a control frame (ping, close) regardless of subscriptions.
    /// Dropped if the outbound queue is full.
    pub(crate) fn send_control(&self, message: Message) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.sender.try_send(message) {
            tracing::debug!(conn_id = %self.id, "Outbound queue full, dropped control frame");
        }
    }
}

impl Observer for WsObserver {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.sender.is_closed()
    }

    fn send(&self, frame: &str) -> Result<(), SendError> {
        if !self.is_open() {
            return Err(SendError::Closed);
        }
        self.sender
            .try_send(Message::Text(frame.into()))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => SendError::Full,
                mpsc::error::TrySendError::Closed(_) => SendError::Closed,
            })
    }
}
