//! Domain types shared by every jobwire crate.
//!
//! Nothing in here performs I/O except the [`store::InMemoryJobStore`],
//! which only touches process memory.

pub mod catalog;
pub mod error;
pub mod events;
pub mod jobs;
pub mod store;
pub mod types;
pub mod validation;
