//! Distributed-cache ticket store backed by Redis.
//!
//! - **Key**: `<prefix>.<ticket id>`
//! - **Value**: versioned JSON record
//! - **Expiry**: `SET … EXAT <validBefore>`, so the cache evicts the ticket on its
//!   own. Eviction may happen slightly before or after `validBefore`; callers still
//!   run their own expiry check after fetching.
//! - **Consumption**: `DEL` is atomic and reports how many keys it removed, so of
//!   several concurrent deletes only one sees `1`.
//!
//! The client is injected at construction; there is no process-wide connection.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use casserver_core::{Ticket, TicketId, TicketStore, TicketStoreError};

use super::record;

/// Default Redis URL used when none is configured.
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

#[derive(Debug, Clone)]
pub struct RedisTicketStore {
    client: Arc<redis::Client>,
    prefix: String,
}

impl RedisTicketStore {
    /// Create a store for `redis_url` (e.g. "redis://localhost:6379").
    pub fn new(redis_url: impl AsRef<str>, prefix: impl Into<String>) -> Result<Self, TicketStoreError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| TicketStoreError::configuration(format!("invalid Redis URL: {e}")))?;
        Ok(Self::from_client(Arc::new(client), prefix))
    }

    pub fn from_client(client: Arc<redis::Client>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub(crate) fn scoped_key(&self, id: &TicketId) -> String {
        format!("{}.{}", self.prefix, id)
    }

    fn connection(&self) -> Result<redis::Connection, TicketStoreError> {
        self.client
            .get_connection()
            .map_err(|e| TicketStoreError::backend(format!("Redis connection error: {e}")))
    }
}

/// What `add_ticket` sends to the cache for a ticket at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheWrite {
    /// `SET … EXAT expire_at` (unix seconds).
    Set { expire_at: i64 },
    /// The ticket is already expired: `DEL` the key instead.
    Purge,
}

impl CacheWrite {
    pub(crate) fn plan(ticket: &Ticket, now: DateTime<Utc>) -> Self {
        let expire_at = ticket.valid_before.timestamp();
        if expire_at <= now.timestamp() {
            CacheWrite::Purge
        } else {
            CacheWrite::Set { expire_at }
        }
    }
}

impl TicketStore for RedisTicketStore {
    #[instrument(skip(self), fields(prefix = %self.prefix))]
    fn get_ticket(&self, id: &TicketId) -> Result<Option<Ticket>, TicketStoreError> {
        let mut conn = self.connection()?;

        let raw: Option<String> = redis::cmd("GET")
            .arg(self.scoped_key(id))
            .query(&mut conn)
            .map_err(|e| TicketStoreError::backend(format!("GET failed: {e}")))?;

        raw.map(|raw| record::decode(id, &raw)).transpose()
    }

    #[instrument(skip(self, ticket), fields(prefix = %self.prefix, ticket_id = %ticket.id))]
    fn add_ticket(&self, ticket: &Ticket) -> Result<(), TicketStoreError> {
        let key = self.scoped_key(&ticket.id);
        let mut conn = self.connection()?;

        match CacheWrite::plan(ticket, Utc::now()) {
            CacheWrite::Purge => {
                // Already dead: make sure no older record lingers under the same key.
                debug!("ticket expired before it could be stored");
                let _: u64 = redis::cmd("DEL")
                    .arg(&key)
                    .query(&mut conn)
                    .map_err(|e| TicketStoreError::backend(format!("DEL failed: {e}")))?;
            }
            CacheWrite::Set { expire_at } => {
                let payload = record::encode(ticket)?;
                let _: () = redis::cmd("SET")
                    .arg(&key)
                    .arg(&payload)
                    .arg("EXAT")
                    .arg(expire_at)
                    .query(&mut conn)
                    .map_err(|e| TicketStoreError::backend(format!("SET failed: {e}")))?;
            }
        }

        Ok(())
    }

    fn delete_ticket(&self, id: &TicketId) -> Result<bool, TicketStoreError> {
        let mut conn = self.connection()?;

        let removed: u64 = redis::cmd("DEL")
            .arg(self.scoped_key(id))
            .query(&mut conn)
            .map_err(|e| TicketStoreError::backend(format!("DEL failed: {e}")))?;

        Ok(removed > 0)
    }
}
