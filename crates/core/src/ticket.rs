//! Ticket record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::TicketId;

/// Released identity attributes: name → ordered values.
///
/// Ordering across names carries no meaning; ordering within a value list is
/// preserved end to end.
pub type Attributes = BTreeMap<String, Vec<String>>;

/// Kind of ticket.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketType {
    ServiceTicket,
    ProxyTicket,
    ProxyGrantingTicket,
}

impl TicketType {
    /// Human-recognizable id prefix.
    pub fn prefix(&self) -> &'static str {
        match self {
            TicketType::ServiceTicket => "ST-",
            TicketType::ProxyTicket => "PT-",
            TicketType::ProxyGrantingTicket => "PGT-",
        }
    }
}

impl core::fmt::Display for TicketType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TicketType::ServiceTicket => write!(f, "service ticket"),
            TicketType::ProxyTicket => write!(f, "proxy ticket"),
            TicketType::ProxyGrantingTicket => write!(f, "proxy-granting ticket"),
        }
    }
}

/// A ticket as issued by the [`TicketFactory`](crate::TicketFactory).
///
/// # Invariants
/// - `id` is consumed at most once.
/// - `valid_before` never changes after creation.
/// - `service` is stored exactly as given; normalization only happens when
///   comparing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,

    #[serde(rename = "type")]
    pub ticket_type: TicketType,

    /// Service URL the ticket was issued for (the callback URL for a PGT).
    pub service: String,

    /// Authenticated principal, rendered as `cas:user`.
    pub user_name: String,

    pub valid_before: DateTime<Utc>,

    #[serde(default)]
    pub attributes: Attributes,

    /// IOU correlating an out-of-band PGT delivery with this validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_granting_ticket_iou: Option<String>,

    /// Proxy chain for proxy tickets, most recent proxy first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proxies: Vec<String>,
}

impl Ticket {
    pub fn is_service_ticket(&self) -> bool {
        self.ticket_type == TicketType::ServiceTicket
    }

    pub fn is_proxy_ticket(&self) -> bool {
        self.ticket_type == TicketType::ProxyTicket
    }

    pub fn is_proxy_granting_ticket(&self) -> bool {
        self.ticket_type == TicketType::ProxyGrantingTicket
    }
}
