//! `casserver-protocol` — CAS wire responses.
//!
//! Renders the CAS 1.0 plain-text and CAS 2.0 XML validation documents. The
//! renderers are pure: no storage, no transport, no content negotiation.

pub mod cas10;
pub mod cas20;
pub mod xml_name;

pub use cas10::Cas10;
pub use cas20::{CAS_NAMESPACE, Cas20, Cas20Config, ProtocolError};
pub use xml_name::{AttributeNameError, element_name_for_attribute};
