#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use futures::{SinkExt, StreamExt};
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

use jobwire_api::config::ServerConfig;
use jobwire_api::relay::EventRelay;
use jobwire_api::router::build_app_router;
use jobwire_api::state::AppState;
use jobwire_core::store::InMemoryJobStore;
use jobwire_events::{InMemoryBus, MessageBus, Topics};

/// How long a test waits for a frame before giving up.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Build a test `ServerConfig` with safe defaults and no external services.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        heartbeat_interval_secs: 30,
        redis_url: None,
        database_url: None,
        status_topic: "job:status".to_string(),
        complete_topic: "job:complete".to_string(),
        queue_list: "job:queue".to_string(),
        queue_announce_topic: None,
        json_logs: false,
    }
}

/// Application state over an in-memory store and bus, with handles to both
/// so tests can inspect what the handlers did.
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<InMemoryJobStore>,
    pub bus: Arc<InMemoryBus>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryJobStore::new());
        let bus = Arc::new(InMemoryBus::default());
        let state = AppState::new(test_config(), store.clone(), bus.clone());
        Self { state, store, bus }
    }

    /// The full router with the production middleware stack.
    pub fn router(&self) -> Router {
        build_app_router(self.state.clone(), &self.state.config)
    }

    pub fn topics(&self) -> Topics {
        self.state.config.topics()
    }

    /// Subscribe a relay to the bus and run it in the background.
    ///
    /// The subscription is live when this returns, so events published
    /// afterwards are not missed.
    pub async fn start_relay(&self) -> tokio::task::JoinHandle<()> {
        let topics = self.topics();
        let receiver = self
            .bus
            .subscribe(&topics.all())
            .await
            .expect("in-memory bus subscribes");
        let relay = EventRelay::new(Arc::clone(&self.state.registry), topics);
        tokio::spawn(relay.run(receiver))
    }

    /// Serve the router on an ephemeral port with a live relay.
    pub async fn spawn_server(&self) -> SocketAddr {
        self.start_relay().await;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let app = self.router();
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test server");
        });
        addr
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Send one request through `app` and decode the JSON body.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

// ---------------------------------------------------------------------------
// WebSocket helpers
// ---------------------------------------------------------------------------

pub async fn connect_ws(addr: SocketAddr) -> WsClient {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/api/v1/ws"))
        .await
        .expect("WebSocket handshake");
    ws
}

pub async fn send_text(ws: &mut WsClient, text: &str) {
    ws.send(Message::Text(text.to_string())).await.unwrap();
}

pub async fn send_json(ws: &mut WsClient, value: Value) {
    send_text(ws, &value.to_string()).await;
}

/// Next JSON text frame, skipping transport-level ping/pong.
pub async fn recv_json(ws: &mut WsClient) -> Value {
    loop {
        let frame = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection ended")
            .expect("WebSocket error");
        match frame {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Subscribe and wait for the acknowledgment.
pub async fn subscribe(ws: &mut WsClient, job_id: &str) {
    send_json(ws, serde_json::json!({"type": "subscribe", "job_id": job_id})).await;
    let ack = recv_json(ws).await;
    assert_eq!(ack["type"], "subscribed");
    assert_eq!(ack["job_id"], job_id);
}

/// Round-trip a ping so every frame sent before it has been processed.
pub async fn sync(ws: &mut WsClient) {
    send_json(ws, serde_json::json!({"type": "ping"})).await;
    let pong = recv_json(ws).await;
    assert_eq!(pong["type"], "pong");
}

/// Poll `check` until it returns true or the receive timeout elapses.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
    while !check().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
