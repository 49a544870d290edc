//! Bus-to-WebSocket event relay.
//!
//! [`EventRelay`] listens on the status and completion topics and forwards
//! each event to the observers subscribed to its job.

mod listener;

pub use listener::EventRelay;
