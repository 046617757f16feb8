//! Ticket identifiers.

use core::fmt::Write as _;

use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::ticket::TicketType;

/// Number of random bytes behind every generated id (40 hex characters).
const RANDOM_BYTES: usize = 20;

/// Prefix used for proxy-granting ticket IOUs.
pub const PGT_IOU_PREFIX: &str = "PGTIOU-";

/// Identifier of a ticket (`ST-…`, `PT-…`, `PGT-…`).
///
/// Ids presented by clients are wrapped as-is; only ids produced by
/// [`TicketId::generate`] are guaranteed to carry a known prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    /// Mint a fresh id for a ticket of the given type.
    pub fn generate(ticket_type: TicketType) -> Self {
        Self(random_token(ticket_type.prefix()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// The ticket type announced by the id prefix, if any.
    pub fn ticket_type(&self) -> Option<TicketType> {
        [TicketType::ServiceTicket, TicketType::ProxyTicket, TicketType::ProxyGrantingTicket]
            .into_iter()
            .find(|t| self.0.starts_with(t.prefix()))
    }
}

impl core::fmt::Display for TicketId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TicketId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TicketId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<TicketId> for String {
    fn from(value: TicketId) -> Self {
        value.0
    }
}

impl AsRef<str> for TicketId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Mint a proxy-granting ticket IOU.
pub fn generate_pgt_iou() -> String {
    random_token(PGT_IOU_PREFIX)
}

fn random_token(prefix: &str) -> String {
    let mut bytes = [0u8; RANDOM_BYTES];
    OsRng.fill_bytes(&mut bytes);

    let mut out = String::with_capacity(prefix.len() + RANDOM_BYTES * 2);
    out.push_str(prefix);
    for b in bytes {
        // Writing into a String cannot fail.
        let _ = write!(out, "{b:02x}");
    }
    out
}
