use std::sync::Arc;

use jobwire_core::store::JobStore;
use jobwire_events::{JobQueue, MessageBus};

use crate::config::ServerConfig;
use crate::ws::{SubscriptionRegistry, WsManager};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Persistent job records.
    pub jobs: Arc<dyn JobStore>,
    /// Broker shared by the queue producer and the event relay.
    pub bus: Arc<dyn MessageBus>,
    /// Work-queue producer.
    pub queue: JobQueue,
    /// Every live WebSocket connection.
    pub ws_manager: Arc<WsManager>,
    /// Job id to observer membership.
    pub registry: Arc<SubscriptionRegistry>,
}

impl AppState {
    /// Assemble state around a store and bus, with an empty connection set
    /// and registry.
    pub fn new(config: ServerConfig, jobs: Arc<dyn JobStore>, bus: Arc<dyn MessageBus>) -> Self {
        let mut queue = JobQueue::new(Arc::clone(&bus), config.queue_list.clone());
        if let Some(topic) = &config.queue_announce_topic {
            queue = queue.with_announce_topic(topic.clone());
        }

        Self {
            config: Arc::new(config),
            jobs,
            bus,
            queue,
            ws_manager: Arc::new(WsManager::new()),
            registry: Arc::new(SubscriptionRegistry::new()),
        }
    }
}
