//! Protocol-level error model.

use thiserror::Error;

/// Result type used across the validation and issuance layers.
pub type CasResult<T> = Result<T, CasError>;

/// Machine-readable CAS failure code, as carried in the `code` attribute of
/// `cas:authenticationFailure` / `cas:proxyFailure`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidRequest,
    InvalidTicket,
    InvalidService,
    BadPgt,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::InvalidTicket => "INVALID_TICKET",
            ErrorCode::InvalidService => "INVALID_SERVICE",
            ErrorCode::BadPgt => "BAD_PGT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed negative outcome of a CAS operation.
///
/// Every variant carries the human-readable explanation that ends up as the
/// text of the failure element. None of these are retried: ticket consumption
/// is one-shot, so a second attempt can only fail with `InvalidTicket`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CasError {
    /// A required request parameter was missing or empty.
    #[error("{0}")]
    MissingParameter(String),

    /// Unknown ticket id, expired ticket, or a ticket of the wrong type.
    #[error("{0}")]
    InvalidTicket(String),

    /// The presented service does not match the one the ticket was issued for.
    #[error("{0}")]
    InvalidService(String),

    /// The backend could not produce the record (I/O failure, corrupt record).
    ///
    /// Reported to clients the same way as an unknown ticket.
    #[error("{0}")]
    Storage(String),

    /// The proxy-granting ticket presented to `/proxy` is unusable.
    #[error("{0}")]
    BadProxyGrantingTicket(String),

    /// Anything else that prevented a response from being produced.
    #[error("{0}")]
    Internal(String),
}

impl CasError {
    pub fn missing_parameter(name: &str) -> Self {
        Self::MissingParameter(format!("Missing {name} parameter: [{name}]"))
    }

    pub fn invalid_ticket(msg: impl Into<String>) -> Self {
        Self::InvalidTicket(msg.into())
    }

    pub fn invalid_service(msg: impl Into<String>) -> Self {
        Self::InvalidService(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn bad_pgt(msg: impl Into<String>) -> Self {
        Self::BadProxyGrantingTicket(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Wire code for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            CasError::MissingParameter(_) => ErrorCode::InvalidRequest,
            CasError::InvalidTicket(_) | CasError::Storage(_) => ErrorCode::InvalidTicket,
            CasError::InvalidService(_) => ErrorCode::InvalidService,
            CasError::BadProxyGrantingTicket(_) => ErrorCode::BadPgt,
            CasError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Human-readable explanation.
    pub fn explanation(&self) -> &str {
        match self {
            CasError::MissingParameter(m)
            | CasError::InvalidTicket(m)
            | CasError::InvalidService(m)
            | CasError::Storage(m)
            | CasError::BadProxyGrantingTicket(m)
            | CasError::Internal(m) => m,
        }
    }
}
