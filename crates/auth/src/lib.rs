//! `casserver-auth` — ticket validation boundary.
//!
//! This crate is intentionally decoupled from HTTP and from any particular
//! storage backend: it drives whatever [`TicketStore`](casserver_core::TicketStore)
//! it is given.

pub mod sanitize;
pub mod service_policy;
pub mod validator;

pub use sanitize::sanitize;
pub use service_policy::ServicePolicy;
pub use validator::{TicketValidator, ValidationScope};
