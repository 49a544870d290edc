//! JSON frames exchanged with WebSocket clients.
//!
//! Inbound: `{"type": "subscribe" | "unsubscribe" | "ping", "job_id"?: ...}`.
//! Outbound: `{"type": "status" | "complete" | "error" | "subscribed" | "pong", ...}`.

use jobwire_core::events::{CompletionEvent, StatusEvent};
use jobwire_core::types::JobId;
use serde::{Deserialize, Serialize};

/// A control message sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Subscribe { job_id: JobId },
    Unsubscribe { job_id: JobId },
    Ping,
}

impl ClientMessage {
    /// Parse a text frame. Anything that does not match the schema is an error.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// A frame pushed to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Status {
        job_id: JobId,
        data: StatusEvent,
    },
    Complete {
        job_id: JobId,
        data: CompletionEvent,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        job_id: Option<JobId>,
        message: String,
    },
    Subscribed {
        job_id: JobId,
    },
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use jobwire_core::jobs::JobStatus;
    use serde_json::{json, Value};

    #[test]
    fn parses_control_messages() {
        assert_eq!(
            ClientMessage::parse(r#"{"type":"subscribe","job_id":"J1"}"#).unwrap(),
            ClientMessage::Subscribe { job_id: "J1".into() }
        );
        assert_eq!(
            ClientMessage::parse(r#"{"type":"unsubscribe","job_id":"J1"}"#).unwrap(),
            ClientMessage::Unsubscribe { job_id: "J1".into() }
        );
        assert_eq!(ClientMessage::parse(r#"{"type":"ping"}"#).unwrap(), ClientMessage::Ping);
    }

    #[test]
    fn rejects_malformed_frames() {
        assert_matches!(ClientMessage::parse("not json"), Err(_));
        assert_matches!(ClientMessage::parse(r#"{"type":"subscribe"}"#), Err(_));
        assert_matches!(ClientMessage::parse(r#"{"type":"shout","job_id":"J1"}"#), Err(_));
        assert_matches!(ClientMessage::parse(r#"{"job_id":"J1"}"#), Err(_));
        assert_matches!(ClientMessage::parse(r#"{"type":"subscribe","job_id":7}"#), Err(_));
    }

    #[test]
    fn pong_has_no_job_id() {
        let value = serde_json::to_value(ServerMessage::Pong).unwrap();
        assert_eq!(value, json!({"type": "pong"}));
    }

    #[test]
    fn status_frame_nests_event_under_data() {
        let event = StatusEvent::new("J1", JobStatus::Processing).with_progress(50.0);
        let value: Value = serde_json::to_value(ServerMessage::Status {
            job_id: "J1".into(),
            data: event,
        })
        .unwrap();

        assert_eq!(value["type"], "status");
        assert_eq!(value["job_id"], "J1");
        assert_eq!(value["data"]["status"], "processing");
        assert_eq!(value["data"]["progress"].as_f64(), Some(50.0));
    }

    #[test]
    fn error_frame_omits_missing_job_id() {
        let value = serde_json::to_value(ServerMessage::Error {
            job_id: None,
            message: "nope".into(),
        })
        .unwrap();
        assert_eq!(value, json!({"type": "error", "message": "nope"}));
    }
}
