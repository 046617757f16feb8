//! `casserver-service` — CAS endpoint orchestration.
//!
//! [`CasService`] wires the ticket store, factory, validator and response
//! renderers together behind one call per CAS endpoint. Transport (HTTP routing,
//! redirects, callback delivery) stays with the caller.

pub mod cas_service;
pub mod error;
pub mod proxy_callback;

pub use cas_service::{AuthenticatedIdentity, CasService, LoginRedirect, LogoutSettings};
pub use error::ServiceError;
pub use proxy_callback::{CallbackError, DisabledProxyCallback, ProxyCallback};
