use std::collections::HashMap;
use std::sync::RwLock;

use casserver_core::{Ticket, TicketId, TicketStore, TicketStoreError};

/// In-memory ticket store.
///
/// Intended for tests and single-process deployments; tickets do not survive a
/// restart and expired records are only removed when consumed.
#[derive(Debug, Default)]
pub struct InMemoryTicketStore {
    tickets: RwLock<HashMap<TicketId, Ticket>>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize, TicketStoreError> {
        let tickets = self
            .tickets
            .read()
            .map_err(|_| TicketStoreError::backend("lock poisoned"))?;
        Ok(tickets.len())
    }

    pub fn is_empty(&self) -> Result<bool, TicketStoreError> {
        Ok(self.len()? == 0)
    }
}

impl TicketStore for InMemoryTicketStore {
    fn get_ticket(&self, id: &TicketId) -> Result<Option<Ticket>, TicketStoreError> {
        let tickets = self
            .tickets
            .read()
            .map_err(|_| TicketStoreError::backend("lock poisoned"))?;
        Ok(tickets.get(id).cloned())
    }

    fn add_ticket(&self, ticket: &Ticket) -> Result<(), TicketStoreError> {
        let mut tickets = self
            .tickets
            .write()
            .map_err(|_| TicketStoreError::backend("lock poisoned"))?;
        tickets.insert(ticket.id.clone(), ticket.clone());
        Ok(())
    }

    fn delete_ticket(&self, id: &TicketId) -> Result<bool, TicketStoreError> {
        let mut tickets = self
            .tickets
            .write()
            .map_err(|_| TicketStoreError::backend("lock poisoned"))?;
        Ok(tickets.remove(id).is_some())
    }
}
