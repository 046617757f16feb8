//! Ticket persistence boundary.
//!
//! The store is the **sole source of truth** for tickets: there is no in-process
//! cache in front of it, and it may be shared by many concurrent request
//! handlers. Backends live in `casserver-infra`.

use std::sync::Arc;

use thiserror::Error;

use crate::id::TicketId;
use crate::ticket::Ticket;

/// Backend-level failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TicketStoreError {
    /// The backend cannot be constructed from its configuration (fatal at startup).
    #[error("ticket store configuration error: {0}")]
    Configuration(String),

    /// A stored record exists but cannot be decoded.
    #[error("corrupt ticket record '{id}': {reason}")]
    Corrupt { id: String, reason: String },

    /// I/O or network failure talking to the backend.
    #[error("ticket store backend error: {0}")]
    Backend(String),
}

impl TicketStoreError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn corrupt(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Key-value storage of tickets with expiry.
///
/// ## Contract
///
/// - `get_ticket`: exact-id lookup, no side effects. A record that cannot be
///   decoded is reported as [`TicketStoreError::Corrupt`], never repaired.
/// - `add_ticket`: persists the whole record under its id, overwriting any prior
///   record with the same id.
/// - `delete_ticket`: removes the record. Deleting an unknown id is a no-op and
///   returns `Ok(false)`; `Ok(true)` means *this* call removed the record.
///
/// Implementations must make `delete_ticket` atomic: when several callers race to
/// delete the same id, at most one observes `Ok(true)`. Validation relies on this
/// for at-most-once consumption.
pub trait TicketStore: Send + Sync {
    fn get_ticket(&self, id: &TicketId) -> Result<Option<Ticket>, TicketStoreError>;

    fn add_ticket(&self, ticket: &Ticket) -> Result<(), TicketStoreError>;

    fn delete_ticket(&self, id: &TicketId) -> Result<bool, TicketStoreError>;
}

impl<S> TicketStore for Arc<S>
where
    S: TicketStore + ?Sized,
{
    fn get_ticket(&self, id: &TicketId) -> Result<Option<Ticket>, TicketStoreError> {
        (**self).get_ticket(id)
    }

    fn add_ticket(&self, ticket: &Ticket) -> Result<(), TicketStoreError> {
        (**self).add_ticket(ticket)
    }

    fn delete_ticket(&self, id: &TicketId) -> Result<bool, TicketStoreError> {
        (**self).delete_ticket(id)
    }
}

impl<S> TicketStore for Box<S>
where
    S: TicketStore + ?Sized,
{
    fn get_ticket(&self, id: &TicketId) -> Result<Option<Ticket>, TicketStoreError> {
        (**self).get_ticket(id)
    }

    fn add_ticket(&self, ticket: &Ticket) -> Result<(), TicketStoreError> {
        (**self).add_ticket(ticket)
    }

    fn delete_ticket(&self, id: &TicketId) -> Result<bool, TicketStoreError> {
        (**self).delete_ticket(id)
    }
}
