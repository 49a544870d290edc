use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};

use crate::state::AppState;
use crate::ws::manager::WsManager;
use crate::ws::observer::{send_message, Observer};
use crate::ws::protocol::{ClientMessage, ServerMessage};
use crate::ws::registry::SubscriptionRegistry;

/// HTTP handler that upgrades the connection to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.ws_manager, state.registry))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with `WsManager`.
///   2. Spawns a sender task that forwards queued frames to the sink.
///   3. Dispatches inbound control messages on the current task.
///   4. Cleans up once, whatever ended the receive loop.
async fn handle_socket(
    socket: WebSocket,
    ws_manager: Arc<WsManager>,
    registry: Arc<SubscriptionRegistry>,
) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let (ws_observer, mut rx) = ws_manager.add(conn_id.clone()).await;
    let observer: Arc<dyn Observer> = ws_observer.clone();

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => handle_text_frame(text.as_str(), &observer, &registry).await,
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            // Binary frames carry nothing we understand; transport pings are
            // answered by axum.
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    ws_observer.close();
    let removed = registry.remove_observer_everywhere(&conn_id).await;
    ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, subscriptions = removed, "WebSocket disconnected");
}

/// Apply one inbound text frame for `observer`.
///
/// Malformed frames are logged and dropped; the connection stays open.
pub async fn handle_text_frame(
    text: &str,
    observer: &Arc<dyn Observer>,
    registry: &SubscriptionRegistry,
) {
    let message = match ClientMessage::parse(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(conn_id = %observer.id(), error = %e, "Dropping malformed frame");
            return;
        }
    };

    match message {
        ClientMessage::Subscribe { job_id } => {
            let job_id = job_id.trim();
            if job_id.is_empty() {
                send_message(
                    observer.as_ref(),
                    &ServerMessage::Error {
                        job_id: None,
                        message: "job_id must not be empty".into(),
                    },
                );
                return;
            }
            if registry.subscribe(job_id, observer).await {
                tracing::debug!(conn_id = %observer.id(), job_id = %job_id, "Subscribed");
            }
            send_message(
                observer.as_ref(),
                &ServerMessage::Subscribed {
                    job_id: job_id.to_string(),
                },
            );
        }
        ClientMessage::Unsubscribe { job_id } => {
            let job_id = job_id.trim();
            if registry.unsubscribe(job_id, observer.id()).await {
                tracing::debug!(conn_id = %observer.id(), job_id = %job_id, "Unsubscribed");
            }
        }
        ClientMessage::Ping => send_message(observer.as_ref(), &ServerMessage::Pong),
    }
}
