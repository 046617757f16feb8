//! Ticket store backends.
//!
//! The [`TicketStore`](casserver_core::TicketStore) contract lives in
//! `casserver-core`. This module provides the concrete backends and the
//! registry that picks one from configuration at startup.

pub mod file_system;
pub mod in_memory;
mod record;
#[cfg(feature = "redis")]
pub mod redis_cache;
pub mod registry;

pub use file_system::FileSystemTicketStore;
pub use in_memory::InMemoryTicketStore;
#[cfg(feature = "redis")]
pub use redis_cache::RedisTicketStore;
pub use registry::{StoreConstructor, TicketStoreRegistry};
