//! Infrastructure layer: ticket store backends and configuration.

pub mod config;
pub mod ticket_store;

pub use config::{CasConfig, ConfigError, TicketStoreConfig};
pub use ticket_store::{
    FileSystemTicketStore, InMemoryTicketStore, StoreConstructor, TicketStoreRegistry,
};
#[cfg(feature = "redis")]
pub use ticket_store::RedisTicketStore;
