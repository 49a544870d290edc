//! Job queue producer.
//!
//! Appends job descriptors to the durable work list consumed by the
//! external analysis worker. Failures are reported, never retried here:
//! the caller marks the job failed and retrying is an explicit user action.

use std::sync::Arc;

use jobwire_core::jobs::JobDescriptor;

use crate::bus::MessageBus;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The bus did not accept the write.
    #[error("Queue unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to encode job descriptor: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Pushes [`JobDescriptor`]s onto the durable work list.
#[derive(Clone)]
pub struct JobQueue {
    bus: Arc<dyn MessageBus>,
    list: String,
    announce_topic: Option<String>,
}

impl JobQueue {
    pub fn new(bus: Arc<dyn MessageBus>, list: impl Into<String>) -> Self {
        Self {
            bus,
            list: list.into(),
            announce_topic: None,
        }
    }

    /// Also publish every enqueued descriptor on `topic`.
    ///
    /// For consumers still listening on the old publish-based queue. The
    /// list stays authoritative: a failed announcement is only logged.
    pub fn with_announce_topic(mut self, topic: impl Into<String>) -> Self {
        self.announce_topic = Some(topic.into());
        self
    }

    /// Append `descriptor` to the work list.
    pub async fn enqueue(&self, descriptor: &JobDescriptor) -> Result<(), QueueError> {
        let payload = serde_json::to_string(descriptor)?;

        self.bus
            .push(&self.list, &payload)
            .await
            .map_err(|e| QueueError::Unavailable(e.to_string()))?;

        if let Some(topic) = &self.announce_topic {
            if let Err(e) = self.bus.publish(topic, &payload).await {
                tracing::warn!(
                    job_id = %descriptor.job_id,
                    topic = %topic,
                    error = %e,
                    "Failed to announce enqueued job",
                );
            }
        }

        tracing::info!(job_id = %descriptor.job_id, list = %self.list, "Job enqueued");
        Ok(())
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("list", &self.list)
            .field("announce_topic", &self.announce_topic)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DEFAULT_QUEUE_LIST;
    use crate::memory::InMemoryBus;
    use assert_matches::assert_matches;
    use jobwire_core::jobs::Job;

    fn descriptor() -> JobDescriptor {
        Job::new("https://github.com/a/b", "gpt-4o").descriptor()
    }

    #[tokio::test]
    async fn enqueue_appends_descriptor_json() {
        let bus = Arc::new(InMemoryBus::default());
        let queue = JobQueue::new(bus.clone(), DEFAULT_QUEUE_LIST);
        let d = descriptor();

        queue.enqueue(&d).await.unwrap();

        let queued = bus.drain_list(DEFAULT_QUEUE_LIST).await;
        assert_eq!(queued.len(), 1);
        let decoded: JobDescriptor = serde_json::from_str(&queued[0]).unwrap();
        assert_eq!(decoded, d);
    }

    #[tokio::test]
    async fn enqueue_fails_when_bus_rejects_writes() {
        let bus = Arc::new(InMemoryBus::default());
        bus.set_available(false);
        let queue = JobQueue::new(bus.clone(), "q");

        assert_matches!(queue.enqueue(&descriptor()).await, Err(QueueError::Unavailable(_)));
    }

    #[tokio::test]
    async fn announce_topic_mirrors_the_push() {
        let bus = Arc::new(InMemoryBus::default());
        let mut rx = bus.subscribe(&["legacy".to_string()]).await.unwrap();
        let queue = JobQueue::new(bus.clone(), "q").with_announce_topic("legacy");
        let d = descriptor();

        queue.enqueue(&d).await.unwrap();

        let announced = rx.recv().await.unwrap();
        assert!(announced.payload.contains(&d.job_id));
        assert_eq!(bus.drain_list("q").await.len(), 1);
    }
}
