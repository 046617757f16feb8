//! Configuration-driven backend selection.
//!
//! Backends are registered under a short key (`filesystem`, `memory`, `redis`)
//! and resolved once at startup from `ticketstore.class`.

use std::collections::BTreeMap;
use std::sync::Arc;

use casserver_core::{TicketStore, TicketStoreError};
use tracing::info;

use crate::config::TicketStoreConfig;

use super::{FileSystemTicketStore, InMemoryTicketStore};

/// Builds a backend from its configuration.
pub type StoreConstructor = fn(&TicketStoreConfig) -> Result<Arc<dyn TicketStore>, TicketStoreError>;

pub const FILESYSTEM: &str = "filesystem";
pub const MEMORY: &str = "memory";
#[cfg(feature = "redis")]
pub const REDIS: &str = "redis";

/// Map of backend keys to constructors.
#[derive(Debug, Clone, Default)]
pub struct TicketStoreRegistry {
    constructors: BTreeMap<String, StoreConstructor>,
}

impl TicketStoreRegistry {
    /// Registry with no backends.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with every backend compiled into this build.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(FILESYSTEM, build_file_system);
        registry.register(MEMORY, build_in_memory);
        #[cfg(feature = "redis")]
        registry.register(REDIS, build_redis);
        registry
    }

    /// Register (or replace) the constructor for `class`.
    pub fn register(&mut self, class: impl Into<String>, constructor: StoreConstructor) -> &mut Self {
        self.constructors.insert(class.into(), constructor);
        self
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Resolve and construct the backend named by `config.class`.
    pub fn build(&self, config: &TicketStoreConfig) -> Result<Arc<dyn TicketStore>, TicketStoreError> {
        let constructor = self.constructors.get(&config.class).ok_or_else(|| {
            let known: Vec<&str> = self.classes().collect();
            TicketStoreError::configuration(format!(
                "unknown ticket store class '{}' (known: {})",
                config.class,
                known.join(", ")
            ))
        })?;

        let store = constructor(config)?;
        info!(class = %config.class, "ticket store initialized");
        Ok(store)
    }
}

fn build_file_system(config: &TicketStoreConfig) -> Result<Arc<dyn TicketStore>, TicketStoreError> {
    Ok(Arc::new(FileSystemTicketStore::new(&config.directory)?))
}

fn build_in_memory(_config: &TicketStoreConfig) -> Result<Arc<dyn TicketStore>, TicketStoreError> {
    Ok(Arc::new(InMemoryTicketStore::new()))
}

#[cfg(feature = "redis")]
fn build_redis(config: &TicketStoreConfig) -> Result<Arc<dyn TicketStore>, TicketStoreError> {
    let url = config
        .redis_url
        .as_deref()
        .unwrap_or(super::redis_cache::DEFAULT_REDIS_URL);
    Ok(Arc::new(super::RedisTicketStore::new(url, config.prefix.clone())?))
}
