//! Typed view of the status and completion topics.

use jobwire_core::events::{CompletionEvent, StatusEvent};

use crate::bus::{BusError, BusMessage, MessageBus};

/// Default name of the durable work list.
pub const DEFAULT_QUEUE_LIST: &str = "job:queue";

/// Names of the two broadcast topics the relay listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub status: String,
    pub complete: String,
}

impl Topics {
    pub fn new(status: impl Into<String>, complete: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            complete: complete.into(),
        }
    }

    /// Both topics, in subscription order.
    pub fn all(&self) -> Vec<String> {
        vec![self.status.clone(), self.complete.clone()]
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self::new("job:status", "job:complete")
    }
}

/// An event received from one of the relay topics.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    Status(StatusEvent),
    Complete(CompletionEvent),
}

impl BusEvent {
    /// Decode a raw bus message.
    ///
    /// Returns `Ok(None)` for topics other than the two relay topics and
    /// `Err` when the payload does not match the topic's schema.
    pub fn decode(message: &BusMessage, topics: &Topics) -> Result<Option<Self>, serde_json::Error> {
        if message.topic == topics.status {
            serde_json::from_str(&message.payload).map(|e| Some(BusEvent::Status(e)))
        } else if message.topic == topics.complete {
            serde_json::from_str(&message.payload).map(|e| Some(BusEvent::Complete(e)))
        } else {
            Ok(None)
        }
    }

    pub fn job_id(&self) -> &str {
        match self {
            BusEvent::Status(e) => &e.job_id,
            BusEvent::Complete(e) => &e.job_id,
        }
    }

    /// The topic this event travels on.
    pub fn topic<'a>(&self, topics: &'a Topics) -> &'a str {
        match self {
            BusEvent::Status(_) => &topics.status,
            BusEvent::Complete(_) => &topics.complete,
        }
    }
}

/// Publish an event on its topic. Used by worker-side producers.
pub async fn publish_event(
    bus: &dyn MessageBus,
    topics: &Topics,
    event: &BusEvent,
) -> Result<(), BusError> {
    let payload = match event {
        BusEvent::Status(e) => serde_json::to_string(e),
        BusEvent::Complete(e) => serde_json::to_string(e),
    }
    .map_err(|e| BusError::Transport(format!("unencodable event: {e}")))?;
    bus.publish(event.topic(topics), &payload).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use jobwire_core::jobs::JobStatus;

    fn msg(topic: &str, payload: &str) -> BusMessage {
        BusMessage {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    #[test]
    fn decodes_status_topic() {
        let topics = Topics::default();
        let event = BusEvent::decode(
            &msg("job:status", r#"{"job_id":"J1","status":"processing","progress":50}"#),
            &topics,
        )
        .unwrap();

        assert_matches!(event, Some(BusEvent::Status(e)) if e.job_id == "J1" && e.status == JobStatus::Processing);
    }

    #[test]
    fn decodes_completion_topic() {
        let topics = Topics::default();
        let event = BusEvent::decode(
            &msg("job:complete", r#"{"job_id":"J2","success":false,"error":"boom"}"#),
            &topics,
        )
        .unwrap()
        .unwrap();

        assert_eq!(event.job_id(), "J2");
        assert_matches!(event, BusEvent::Complete(e) if !e.success);
    }

    #[test]
    fn unknown_topic_is_ignored() {
        let topics = Topics::default();
        assert_matches!(BusEvent::decode(&msg("other", "{}"), &topics), Ok(None));
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let topics = Topics::default();
        assert!(BusEvent::decode(&msg("job:status", "{not json"), &topics).is_err());
        assert!(BusEvent::decode(&msg("job:complete", r#"{"job_id":"J"}"#), &topics).is_err());
    }

    #[test]
    fn custom_topic_names_are_respected() {
        let topics = Topics::new("s", "c");
        assert_eq!(topics.all(), vec!["s".to_string(), "c".to_string()]);
        assert_matches!(
            BusEvent::decode(&msg("job:status", r#"{"job_id":"J","status":"pending"}"#), &topics),
            Ok(None)
        );
    }
}
