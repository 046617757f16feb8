//! Ticket construction and expiry.

use chrono::{DateTime, Duration, Utc};

use crate::id::TicketId;
use crate::ticket::{Attributes, Ticket, TicketType};

/// Lifetime of each ticket type.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TicketLifetimes {
    pub service_ticket: Duration,
    pub proxy_ticket: Duration,
    pub proxy_granting_ticket: Duration,
}

impl Default for TicketLifetimes {
    fn default() -> Self {
        Self {
            service_ticket: Duration::seconds(5),
            proxy_ticket: Duration::seconds(5),
            proxy_granting_ticket: Duration::seconds(3600),
        }
    }
}

/// Builds ticket records and decides whether one has expired.
///
/// All minting operations take the issuance instant explicitly so callers (and
/// tests) control time.
#[derive(Debug, Clone, Default)]
pub struct TicketFactory {
    lifetimes: TicketLifetimes,
}

impl TicketFactory {
    pub fn new(lifetimes: TicketLifetimes) -> Self {
        Self { lifetimes }
    }

    pub fn lifetimes(&self) -> &TicketLifetimes {
        &self.lifetimes
    }

    /// Mint a service ticket for `service` on behalf of `user_name`.
    pub fn create_service_ticket(
        &self,
        service: impl Into<String>,
        user_name: impl Into<String>,
        attributes: Attributes,
        now: DateTime<Utc>,
    ) -> Ticket {
        Ticket {
            id: TicketId::generate(TicketType::ServiceTicket),
            ticket_type: TicketType::ServiceTicket,
            service: service.into(),
            user_name: user_name.into(),
            valid_before: expiry(now, self.lifetimes.service_ticket),
            attributes,
            proxy_granting_ticket_iou: None,
            proxies: Vec::new(),
        }
    }

    /// Mint a proxy-granting ticket delivered to `pgt_url`, inheriting the
    /// identity of the ticket that was just validated.
    ///
    /// The callback URL becomes the most recent entry in the proxy chain.
    pub fn create_proxy_granting_ticket(
        &self,
        pgt_url: impl Into<String>,
        validated: &Ticket,
        iou: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Ticket {
        let pgt_url = pgt_url.into();
        let mut proxies = Vec::with_capacity(validated.proxies.len() + 1);
        proxies.push(pgt_url.clone());
        proxies.extend(validated.proxies.iter().cloned());

        Ticket {
            id: TicketId::generate(TicketType::ProxyGrantingTicket),
            ticket_type: TicketType::ProxyGrantingTicket,
            service: pgt_url,
            user_name: validated.user_name.clone(),
            valid_before: expiry(now, self.lifetimes.proxy_granting_ticket),
            attributes: validated.attributes.clone(),
            proxy_granting_ticket_iou: Some(iou.into()),
            proxies,
        }
    }

    /// Mint a proxy ticket for `target_service` from a proxy-granting ticket.
    pub fn create_proxy_ticket(
        &self,
        target_service: impl Into<String>,
        pgt: &Ticket,
        now: DateTime<Utc>,
    ) -> Ticket {
        Ticket {
            id: TicketId::generate(TicketType::ProxyTicket),
            ticket_type: TicketType::ProxyTicket,
            service: target_service.into(),
            user_name: pgt.user_name.clone(),
            valid_before: expiry(now, self.lifetimes.proxy_ticket),
            attributes: pgt.attributes.clone(),
            proxy_granting_ticket_iou: None,
            proxies: pgt.proxies.clone(),
        }
    }

    /// True iff the current time is at or after `valid_before`.
    pub fn is_expired(&self, ticket: &Ticket) -> bool {
        self.is_expired_at(ticket, Utc::now())
    }

    /// Expiry check against an explicit instant (boundary inclusive).
    pub fn is_expired_at(&self, ticket: &Ticket, now: DateTime<Utc>) -> bool {
        now >= ticket.valid_before
    }
}

/// `now + lifetime`, clamped to the latest representable instant.
fn expiry(now: DateTime<Utc>, lifetime: Duration) -> DateTime<Utc> {
    now.checked_add_signed(lifetime).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
