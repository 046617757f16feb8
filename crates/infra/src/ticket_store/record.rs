//! Versioned on-the-wire form of a ticket.
//!
//! Backends never persist a bare `Ticket`: they wrap it in an envelope carrying
//! a schema version so that records written by a different build are rejected
//! as corrupt instead of being half-read.

use serde::{Deserialize, Serialize};

use casserver_core::{Ticket, TicketId, TicketStoreError};

/// Current record schema version.
pub(crate) const RECORD_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
struct TicketRecordRef<'a> {
    version: u32,
    ticket: &'a Ticket,
}

#[derive(Debug, Deserialize)]
struct TicketRecord {
    version: u32,
    ticket: Ticket,
}

pub(crate) fn encode(ticket: &Ticket) -> Result<String, TicketStoreError> {
    serde_json::to_string(&TicketRecordRef {
        version: RECORD_VERSION,
        ticket,
    })
    .map_err(|e| TicketStoreError::backend(format!("ticket serialization failed: {e}")))
}

/// Decode a record stored under `id`.
pub(crate) fn decode(id: &TicketId, raw: &str) -> Result<Ticket, TicketStoreError> {
    let record: TicketRecord =
        serde_json::from_str(raw).map_err(|e| TicketStoreError::corrupt(id.as_str(), e.to_string()))?;

    if record.version != RECORD_VERSION {
        return Err(TicketStoreError::corrupt(
            id.as_str(),
            format!("unsupported record version {}", record.version),
        ));
    }
    if &record.ticket.id != id {
        return Err(TicketStoreError::corrupt(
            id.as_str(),
            format!("record holds ticket '{}'", record.ticket.id),
        ));
    }

    Ok(record.ticket)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use casserver_core::{Attributes, TicketFactory};

    use super::*;

    fn ticket() -> Ticket {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        TicketFactory::default().create_service_ticket("https://svc", "jdoe", Attributes::new(), now)
    }

    #[test]
    fn envelope_carries_version() {
        let raw = encode(&ticket()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["ticket"]["type"], "service_ticket");
    }

    #[test]
    fn rejects_other_versions() {
        let t = ticket();
        let raw = encode(&t).unwrap().replacen("\"version\":1", "\"version\":2", 1);
        assert!(matches!(decode(&t.id, &raw), Err(TicketStoreError::Corrupt { .. })));
    }

    #[test]
    fn rejects_record_for_other_id() {
        let t = ticket();
        let raw = encode(&t).unwrap();
        let other = TicketId::from("ST-other");
        assert!(matches!(decode(&other, &raw), Err(TicketStoreError::Corrupt { .. })));
    }

    #[test]
    fn rejects_garbage() {
        let id = TicketId::from("ST-1");
        assert!(matches!(decode(&id, "a:3:{s:2:\"id\";"), Err(TicketStoreError::Corrupt { .. })));
    }
}
