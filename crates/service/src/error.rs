use thiserror::Error;

use casserver_core::{CasError, TicketStoreError};
use casserver_protocol::ProtocolError;

/// Failures that abort an endpoint instead of producing a CAS failure document.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Cas(#[from] CasError),

    #[error("Service parameter provided to CAS server is not listed as a legal service: [service] = {0}")]
    IllegalService(String),

    #[error("Logout not allowed")]
    LogoutDisabled,

    #[error("Required URL query parameter [url] not provided. (CAS Server)")]
    MissingLogoutUrl,

    #[error(transparent)]
    Store(#[from] TicketStoreError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
