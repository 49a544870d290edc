//! Live job updates over WebSocket.
//!
//! - [`handler`] upgrades `/api/v1/ws` and runs the per-connection loop.
//! - [`SubscriptionRegistry`] maps job ids to the observers watching them.
//! - [`WsManager`] tracks every live connection for stats and shutdown.
//! - [`protocol`] defines the JSON frames in both directions.

mod handler;
mod heartbeat;
pub mod manager;
pub mod observer;
pub mod protocol;
pub mod registry;

pub use handler::{handle_text_frame, ws_handler};
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
pub use observer::{send_message, ConnId, Observer, SendError, WsObserver, OUTBOUND_BUFFER};
pub use protocol::{ClientMessage, ServerMessage};
pub use registry::SubscriptionRegistry;
