//! Process-wide logging setup for the CAS server.

/// Subscriber configuration (filters, output format).
pub mod tracing;

pub use self::tracing::{DEFAULT_FILTER, LogFormat, init, init_with};
