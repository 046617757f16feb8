//! Ticket validation state machine.
//!
//! Sequence (order is observable and must not change):
//!
//! 1. **Lookup** the ticket; unknown → `InvalidTicket`.
//! 2. **Consume** it (delete) *before* any other check, so a ticket presented once
//!    can never be validated again, whatever the outcome below.
//! 3. **Type** check against the caller's [`ValidationScope`].
//! 4. **Expiry** check; expired → `InvalidTicket`.
//! 5. **Service** match on sanitized URLs; mismatch → `InvalidService`.
//!
//! If the consume step reports that nothing was deleted, a concurrent validator
//! won the race and this one fails with `InvalidTicket`.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use casserver_core::{CasError, CasResult, Ticket, TicketFactory, TicketId, TicketStore, TicketType};

use crate::sanitize::sanitize;

/// Which ticket types a validation endpoint accepts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValidationScope {
    /// Any ticket type.
    Any,
    /// `/validate` and `/serviceValidate`.
    ServiceTickets,
    /// `/proxyValidate`.
    ServiceAndProxyTickets,
}

impl ValidationScope {
    pub fn accepts(self, ticket_type: TicketType) -> bool {
        match self {
            ValidationScope::Any => true,
            ValidationScope::ServiceTickets => ticket_type == TicketType::ServiceTicket,
            ValidationScope::ServiceAndProxyTickets => matches!(
                ticket_type,
                TicketType::ServiceTicket | TicketType::ProxyTicket
            ),
        }
    }
}

/// Validates and consumes tickets held in a [`TicketStore`].
#[derive(Debug, Clone)]
pub struct TicketValidator<S> {
    store: S,
    factory: TicketFactory,
}

impl<S> TicketValidator<S>
where
    S: TicketStore,
{
    pub fn new(store: S, factory: TicketFactory) -> Self {
        Self { store, factory }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn factory(&self) -> &TicketFactory {
        &self.factory
    }

    /// Validate `ticket_id` for `service` and consume it.
    ///
    /// Returns the ticket record on success. Every presented ticket that exists
    /// is deleted, including ones that then fail a later check.
    pub fn validate_and_delete_ticket(&self, ticket_id: &str, service: &str) -> CasResult<Ticket> {
        self.validate_and_delete_ticket_at(ticket_id, service, ValidationScope::Any, Utc::now())
    }

    /// Same as [`validate_and_delete_ticket`](Self::validate_and_delete_ticket) with an
    /// explicit type scope and clock.
    #[instrument(skip(self), err(level = "debug"))]
    pub fn validate_and_delete_ticket_at(
        &self,
        ticket_id: &str,
        service: &str,
        scope: ValidationScope,
        now: DateTime<Utc>,
    ) -> CasResult<Ticket> {
        if ticket_id.is_empty() {
            return Err(CasError::missing_parameter("ticket"));
        }
        if service.is_empty() {
            return Err(CasError::missing_parameter("service"));
        }

        let id = TicketId::from(ticket_id);

        // 1) Lookup
        let ticket = match self.store.get_ticket(&id) {
            Ok(Some(ticket)) => ticket,
            Ok(None) => {
                debug!(ticket_id, "ticket not recognized");
                return Err(not_recognized(ticket_id));
            }
            Err(e) => {
                warn!(ticket_id, error = %e, "ticket store lookup failed");
                return Err(CasError::storage(format!("Ticket '{ticket_id}' not recognized")));
            }
        };

        // 2) Consume, before any validity check
        match self.store.delete_ticket(&id) {
            Ok(true) => {}
            Ok(false) => {
                debug!(ticket_id, "ticket already consumed by a concurrent validation");
                return Err(not_recognized(ticket_id));
            }
            Err(e) => {
                warn!(ticket_id, error = %e, "ticket store delete failed");
                return Err(CasError::storage(format!("Ticket '{ticket_id}' not recognized")));
            }
        }

        // 3) Type
        if !scope.accepts(ticket.ticket_type) {
            debug!(ticket_id, ticket_type = %ticket.ticket_type, "ticket type not accepted");
            return Err(CasError::invalid_ticket(format!(
                "Ticket '{ticket_id}' is a {} and is not accepted here",
                ticket.ticket_type
            )));
        }

        // 4) Expiry
        if self.factory.is_expired_at(&ticket, now) {
            debug!(ticket_id, valid_before = %ticket.valid_before, "ticket has expired");
            return Err(CasError::invalid_ticket(format!("Ticket '{ticket_id}' has expired")));
        }

        // 5) Service
        if sanitize(&ticket.service) != sanitize(service) {
            let message = format!(
                "Mismatching service parameters: expected '{}' but was: '{}'",
                ticket.service, service
            );
            debug!(ticket_id, "{message}");
            return Err(CasError::invalid_service(message));
        }

        Ok(ticket)
    }
}

fn not_recognized(ticket_id: &str) -> CasError {
    CasError::invalid_ticket(format!("Ticket '{ticket_id}' not recognized"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{Duration, TimeZone};

    use casserver_core::{Attributes, ErrorCode, TicketStoreError};
    use casserver_infra::ticket_store::InMemoryTicketStore;

    use super::*;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn setup() -> (TicketValidator<Arc<InMemoryTicketStore>>, Arc<InMemoryTicketStore>) {
        let store = Arc::new(InMemoryTicketStore::new());
        let validator = TicketValidator::new(store.clone(), TicketFactory::default());
        (validator, store)
    }

    fn issue(store: &InMemoryTicketStore, service: &str, now: DateTime<Utc>) -> Ticket {
        let mut attributes = Attributes::new();
        attributes.insert("mail".to_string(), vec!["jdoe@example.org".to_string()]);
        let ticket = TicketFactory::default().create_service_ticket(service, "jdoe", attributes, now);
        store.add_ticket(&ticket).unwrap();
        ticket
    }

    fn validate(
        validator: &TicketValidator<Arc<InMemoryTicketStore>>,
        id: &str,
        service: &str,
        now: DateTime<Utc>,
    ) -> CasResult<Ticket> {
        validator.validate_and_delete_ticket_at(id, service, ValidationScope::Any, now)
    }

    #[test]
    fn valid_ticket_returns_record_and_is_consumed() {
        let (validator, store) = setup();
        let now = test_time();
        let ticket = issue(&store, "https://svc.example.org/app", now);

        let validated = validate(&validator, ticket.id.as_str(), "https://svc.example.org/app", now).unwrap();
        assert_eq!(validated, ticket);
        assert!(store.get_ticket(&ticket.id).unwrap().is_none());
    }

    #[test]
    fn missing_parameters_fail_fast() {
        let (validator, _) = setup();
        let now = test_time();

        let err = validate(&validator, "", "https://svc", now).unwrap_err();
        assert_eq!(err, CasError::missing_parameter("ticket"));
        assert_eq!(err.code(), ErrorCode::InvalidRequest);

        let err = validate(&validator, "ST-1", "", now).unwrap_err();
        assert_eq!(err, CasError::missing_parameter("service"));
    }

    #[test]
    fn unknown_ticket_is_invalid() {
        let (validator, _) = setup();
        let err = validate(&validator, "ST-unknown", "https://svc", test_time()).unwrap_err();
        assert_eq!(err, CasError::invalid_ticket("Ticket 'ST-unknown' not recognized"));
    }

    #[test]
    fn second_validation_always_fails() {
        let (validator, store) = setup();
        let now = test_time();
        let ticket = issue(&store, "https://svc.example.org/app", now);
        let id = ticket.id.as_str();

        assert!(validate(&validator, id, "https://svc.example.org/app", now).is_ok());
        let err = validate(&validator, id, "https://svc.example.org/app", now).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidTicket);
    }

    #[test]
    fn failed_service_match_still_consumes() {
        let (validator, store) = setup();
        let now = test_time();
        let ticket = issue(&store, "https://svc.example.org/app", now);
        let id = ticket.id.as_str();

        let err = validate(&validator, id, "https://svc.example.org/other", now).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidService);
        assert_eq!(
            err.explanation(),
            "Mismatching service parameters: expected 'https://svc.example.org/app' but was: 'https://svc.example.org/other'"
        );

        // Retrying with the right service is too late.
        let err = validate(&validator, id, "https://svc.example.org/app", now).unwrap_err();
        assert_eq!(err, CasError::invalid_ticket(format!("Ticket '{id}' not recognized")));
    }

    #[test]
    fn expired_ticket_is_consumed_and_invalid() {
        let (validator, store) = setup();
        let issued = test_time();
        let ticket = issue(&store, "https://svc", issued);
        let id = ticket.id.as_str();

        // Default service ticket lifetime is 5s; validBefore == now is expired.
        let err = validate(&validator, id, "https://svc", issued + Duration::seconds(5)).unwrap_err();
        assert_eq!(err, CasError::invalid_ticket(format!("Ticket '{id}' has expired")));
        assert!(store.get_ticket(&ticket.id).unwrap().is_none());
    }

    #[test]
    fn one_second_before_expiry_is_valid() {
        let (validator, store) = setup();
        let issued = test_time();
        let ticket = issue(&store, "https://svc", issued);

        assert!(validate(&validator, ticket.id.as_str(), "https://svc", issued + Duration::seconds(4)).is_ok());
    }

    #[test]
    fn session_id_in_presented_service_is_ignored() {
        let (validator, store) = setup();
        let now = test_time();
        let ticket = issue(&store, "https://svc.example.org/app", now);

        let validated = validate(
            &validator,
            ticket.id.as_str(),
            "https://svc.example.org/app;jsessionid=XYZ",
            now,
        )
        .unwrap();
        assert_eq!(validated.service, "https://svc.example.org/app");
    }

    #[test]
    fn stored_service_is_not_rewritten() {
        let (validator, store) = setup();
        let now = test_time();
        let ticket = issue(&store, "https://svc/app;jsessionid=ABC?x=1", now);

        let validated = validate(&validator, ticket.id.as_str(), "https://svc/app?x=1", now).unwrap();
        assert_eq!(validated.service, "https://svc/app;jsessionid=ABC?x=1");
    }

    #[test]
    fn scope_rejects_wrong_type_after_consuming() {
        let (validator, store) = setup();
        let now = test_time();
        let factory = TicketFactory::default();
        let st = issue(&store, "https://portal", now);
        let pgt = factory.create_proxy_granting_ticket("https://proxy/cb", &st, "PGTIOU-x", now);
        let pt = factory.create_proxy_ticket("https://backend", &pgt, now);
        store.add_ticket(&pt).unwrap();

        let err = validator
            .validate_and_delete_ticket_at(pt.id.as_str(), "https://backend", ValidationScope::ServiceTickets, now)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidTicket);
        assert!(store.get_ticket(&pt.id).unwrap().is_none());

        assert!(ValidationScope::ServiceAndProxyTickets.accepts(TicketType::ProxyTicket));
        assert!(!ValidationScope::ServiceAndProxyTickets.accepts(TicketType::ProxyGrantingTicket));
    }

    #[test]
    fn concurrent_validations_succeed_at_most_once() {
        let (validator, store) = setup();
        let now = test_time();
        let ticket = issue(&store, "https://svc", now);
        let validator = Arc::new(validator);
        let successes = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let validator = validator.clone();
                let successes = successes.clone();
                let id = ticket.id.clone();
                std::thread::spawn(move || {
                    if validate(&validator, id.as_str(), "https://svc", now).is_ok() {
                        successes.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(successes.load(Ordering::SeqCst), 1);
    }

    /// Store whose records are always present but can never be deleted by us,
    /// as if another validator always got there first.
    struct LosingRaceStore(Ticket);

    impl TicketStore for LosingRaceStore {
        fn get_ticket(&self, _id: &TicketId) -> Result<Option<Ticket>, TicketStoreError> {
            Ok(Some(self.0.clone()))
        }

        fn add_ticket(&self, _ticket: &Ticket) -> Result<(), TicketStoreError> {
            Ok(())
        }

        fn delete_ticket(&self, _id: &TicketId) -> Result<bool, TicketStoreError> {
            Ok(false)
        }
    }

    #[test]
    fn losing_the_consume_race_is_invalid_ticket() {
        let now = test_time();
        let ticket = TicketFactory::default().create_service_ticket("https://svc", "jdoe", Attributes::new(), now);
        let validator = TicketValidator::new(LosingRaceStore(ticket.clone()), TicketFactory::default());

        let err = validator
            .validate_and_delete_ticket_at(ticket.id.as_str(), "https://svc", ValidationScope::Any, now)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidTicket);
    }

    struct CorruptStore;

    impl TicketStore for CorruptStore {
        fn get_ticket(&self, id: &TicketId) -> Result<Option<Ticket>, TicketStoreError> {
            Err(TicketStoreError::corrupt(id.as_str(), "truncated"))
        }

        fn add_ticket(&self, _ticket: &Ticket) -> Result<(), TicketStoreError> {
            Ok(())
        }

        fn delete_ticket(&self, _id: &TicketId) -> Result<bool, TicketStoreError> {
            Ok(true)
        }
    }

    #[test]
    fn storage_error_is_reported_as_storage() {
        let validator = TicketValidator::new(CorruptStore, TicketFactory::default());
        let err = validator.validate_and_delete_ticket("ST-1", "https://svc").unwrap_err();

        assert!(matches!(err, CasError::Storage(_)));
        assert_eq!(err.code(), ErrorCode::InvalidTicket);
    }
}
