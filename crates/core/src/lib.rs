//! `casserver-core` — CAS ticket domain building blocks.
//!
//! This crate contains the ticket model, id generation, the ticket factory,
//! the storage abstraction and the protocol error taxonomy. It has **no
//! infrastructure concerns**: backends live in `casserver-infra`.

pub mod error;
pub mod factory;
pub mod id;
pub mod store;
pub mod ticket;

pub use error::{CasError, CasResult, ErrorCode};
pub use factory::{TicketFactory, TicketLifetimes};
pub use id::{TicketId, generate_pgt_iou};
pub use store::{TicketStore, TicketStoreError};
pub use ticket::{Attributes, Ticket, TicketType};
