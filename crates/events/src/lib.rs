//! Message bus plumbing between job producers, the external worker and the
//! live relay.
//!
//! - [`MessageBus`]: publish-by-topic, subscribe-by-topic and durable list
//!   push over a shared broker. [`RedisBus`] talks to Redis;
//!   [`InMemoryBus`] keeps everything in process.
//! - [`BusEvent`]: typed decoding of the status and completion topics.
//! - [`JobQueue`]: pushes job descriptors onto the durable work list.

pub mod bus;
pub mod event;
pub mod memory;
pub mod queue;
pub mod reconnect;
pub mod redis_bus;

pub use bus::{BusError, BusMessage, MessageBus};
pub use event::{publish_event, BusEvent, Topics, DEFAULT_QUEUE_LIST};
pub use memory::InMemoryBus;
pub use queue::{JobQueue, QueueError};
pub use reconnect::{retry_with_backoff, ReconnectConfig};
pub use redis_bus::RedisBus;
