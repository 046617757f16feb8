//! CAS endpoint facade.
//!
//! One method per endpoint:
//!
//! | Endpoint          | Method                                  | Accepts         |
//! |-------------------|-----------------------------------------|-----------------|
//! | `/login`          | [`CasService::login`]                   |                 |
//! | `/validate`       | [`CasService::validate`]                | `ST-`           |
//! | `/serviceValidate`| [`CasService::service_validate`]        | `ST-`           |
//! | `/proxyValidate`  | [`CasService::proxy_validate`]          | `ST-`, `PT-`    |
//! | `/proxy`          | [`CasService::proxy`]                   | `PGT-`          |
//! | `/logout`         | [`CasService::logout`]                  |                 |
//!
//! CAS-level failures (unknown ticket, wrong service, bad PGT) are rendered as
//! failure documents; only infrastructure problems surface as [`ServiceError`].

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use casserver_auth::{ServicePolicy, TicketValidator, ValidationScope};
use casserver_core::{
    Attributes, CasError, CasResult, Ticket, TicketFactory, TicketId, TicketStore, generate_pgt_iou,
};
use casserver_infra::{CasConfig, TicketStoreRegistry};
use casserver_protocol::{Cas10, Cas20, Cas20Config};

use crate::error::ServiceError;
use crate::proxy_callback::ProxyCallback;

/// The user as established by the upstream authentication source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    pub user_name: String,
    pub attributes: Attributes,
}

impl AuthenticatedIdentity {
    pub fn new(user_name: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            user_name: user_name.into(),
            attributes,
        }
    }
}

/// Where to send the browser after a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    pub ticket: TicketId,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutSettings {
    pub enable_logout: bool,
    pub skip_logout_page: bool,
    pub logged_out_url: String,
}

impl LogoutSettings {
    pub fn from_config(config: &CasConfig) -> Self {
        Self {
            enable_logout: config.enable_logout,
            skip_logout_page: config.skip_logout_page,
            logged_out_url: config.logged_out_url.clone(),
        }
    }
}

pub struct CasService {
    validator: TicketValidator<Arc<dyn TicketStore>>,
    policy: ServicePolicy,
    cas20: Cas20,
    proxy_callback: Arc<dyn ProxyCallback>,
    logout: LogoutSettings,
}

impl CasService {
    pub fn new(store: Arc<dyn TicketStore>, config: &CasConfig, proxy_callback: Arc<dyn ProxyCallback>) -> Self {
        Self {
            validator: TicketValidator::new(store, TicketFactory::new(config.lifetimes())),
            policy: ServicePolicy::new(config.legal_service_urls.clone()),
            cas20: Cas20::new(Cas20Config {
                send_attributes: config.send_attributes,
                base64_encode_attributes: config.base64_encode_attributes,
                base64_indicator_attribute: config.base64_indicator_attribute.clone(),
            }),
            proxy_callback,
            logout: LogoutSettings::from_config(config),
        }
    }

    /// Build the service with the ticket store named by `ticketstore.class`.
    pub fn from_config(config: &CasConfig, proxy_callback: Arc<dyn ProxyCallback>) -> anyhow::Result<Self> {
        Self::from_config_with_registry(config, &TicketStoreRegistry::with_defaults(), proxy_callback)
    }

    pub fn from_config_with_registry(
        config: &CasConfig,
        registry: &TicketStoreRegistry,
        proxy_callback: Arc<dyn ProxyCallback>,
    ) -> anyhow::Result<Self> {
        config.validate().context("invalid CAS server configuration")?;
        let store = registry
            .build(&config.ticketstore)
            .with_context(|| format!("cannot initialize ticket store '{}'", config.ticketstore.class))?;
        Ok(Self::new(store, config, proxy_callback))
    }

    pub fn store(&self) -> &Arc<dyn TicketStore> {
        self.validator.store()
    }

    pub fn factory(&self) -> &TicketFactory {
        self.validator.factory()
    }

    /// Issue a service ticket for an authenticated user and build the redirect
    /// back to `service`.
    #[instrument(skip(self, identity), fields(user = %identity.user_name))]
    pub fn login(
        &self,
        identity: &AuthenticatedIdentity,
        service: &str,
        now: DateTime<Utc>,
    ) -> Result<LoginRedirect, ServiceError> {
        if service.is_empty() {
            return Err(CasError::missing_parameter("service").into());
        }
        if !self.policy.is_allowed(service) {
            warn!("service is not listed as a legal service");
            return Err(ServiceError::IllegalService(service.to_string()));
        }

        let ticket = self.factory().create_service_ticket(
            service,
            identity.user_name.clone(),
            identity.attributes.clone(),
            now,
        );
        self.store().add_ticket(&ticket)?;
        info!(ticket_id = %ticket.id, "service ticket issued");

        Ok(LoginRedirect {
            url: append_query_parameter(service, "ticket", ticket.id.as_str()),
            ticket: ticket.id,
        })
    }

    /// CAS 1.0 `/validate`.
    pub fn validate(&self, ticket: &str, service: &str, now: DateTime<Utc>) -> String {
        match self
            .validator
            .validate_and_delete_ticket_at(ticket, service, ValidationScope::ServiceTickets, now)
        {
            Ok(validated) => Cas10.render_validate_success(&validated.user_name),
            Err(_) => Cas10.render_validate_failure(),
        }
    }

    /// CAS 2.0 `/serviceValidate`.
    pub fn service_validate(
        &self,
        ticket: &str,
        service: &str,
        pgt_url: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<String, ServiceError> {
        self.validate_cas20(ticket, service, pgt_url, ValidationScope::ServiceTickets, now)
    }

    /// CAS 2.0 `/proxyValidate`; the response lists the proxy chain.
    pub fn proxy_validate(
        &self,
        ticket: &str,
        service: &str,
        pgt_url: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<String, ServiceError> {
        self.validate_cas20(ticket, service, pgt_url, ValidationScope::ServiceAndProxyTickets, now)
    }

    /// CAS 2.0 `/proxy`: trade a live proxy-granting ticket for a proxy ticket.
    pub fn proxy(&self, pgt: &str, target_service: &str, now: DateTime<Utc>) -> Result<String, ServiceError> {
        let xml = match self.issue_proxy_ticket(pgt, target_service, now) {
            Ok(proxy_ticket) => self.cas20.render_proxy_success(proxy_ticket.id.as_str())?,
            Err(e) => self.cas20.render_proxy_failure(e.code(), e.explanation())?,
        };
        Ok(xml)
    }

    /// `/logout`: forget the ticket held for `session_id` and return the
    /// redirect target. With `skip_logout_page`, `url` must be present (it may
    /// be empty).
    #[instrument(skip(self))]
    pub fn logout(&self, session_id: Option<&str>, url: Option<&str>) -> Result<String, ServiceError> {
        if !self.logout.enable_logout {
            debug!("logout not allowed");
            return Err(ServiceError::LogoutDisabled);
        }

        if self.logout.skip_logout_page && url.is_none() {
            return Err(ServiceError::MissingLogoutUrl);
        }

        if let Some(session_id) = session_id.filter(|s| !s.is_empty()) {
            let removed = self.store().delete_ticket(&TicketId::from(session_id))?;
            debug!(removed, "session ticket cleared");
        }

        let target = match (self.logout.skip_logout_page, url) {
            (true, Some(url)) => url.to_string(),
            (false, Some(url)) => append_query_parameter(&self.logout.logged_out_url, "url", url),
            (_, None) => self.logout.logged_out_url.clone(),
        };
        Ok(target)
    }

    fn validate_cas20(
        &self,
        ticket: &str,
        service: &str,
        pgt_url: Option<&str>,
        scope: ValidationScope,
        now: DateTime<Utc>,
    ) -> Result<String, ServiceError> {
        let validated = match self.validator.validate_and_delete_ticket_at(ticket, service, scope, now) {
            Ok(validated) => validated,
            Err(e) => return Ok(self.cas20.render_validate_failure(e.code(), e.explanation())?),
        };

        let iou = pgt_url
            .filter(|u| !u.is_empty())
            .and_then(|url| self.grant_proxy_granting_ticket(url, &validated, now));

        let proxies: &[String] = match scope {
            ValidationScope::ServiceTickets => &[],
            _ => &validated.proxies,
        };
        Ok(self.cas20.render_proxy_validate_success(
            &validated.user_name,
            &validated.attributes,
            iou.as_deref(),
            proxies,
        )?)
    }

    /// Returns the IOU to embed in the response, or `None` when no PGT was issued.
    fn grant_proxy_granting_ticket(&self, pgt_url: &str, validated: &Ticket, now: DateTime<Utc>) -> Option<String> {
        if !is_https(pgt_url) {
            warn!(pgt_url, "pgtUrl is not https; no proxy-granting ticket issued");
            return None;
        }

        let iou = generate_pgt_iou();
        let pgt = self
            .factory()
            .create_proxy_granting_ticket(pgt_url, validated, iou.clone(), now);

        if let Err(e) = self.proxy_callback.deliver(pgt_url, &pgt.id, &iou) {
            warn!(error = %e, "proxy callback failed; no proxy-granting ticket issued");
            return None;
        }
        if let Err(e) = self.store().add_ticket(&pgt) {
            warn!(error = %e, "cannot store proxy-granting ticket");
            return None;
        }

        info!(ticket_id = %pgt.id, pgt_url, "proxy-granting ticket issued");
        Some(iou)
    }

    fn issue_proxy_ticket(&self, pgt: &str, target_service: &str, now: DateTime<Utc>) -> CasResult<Ticket> {
        if pgt.is_empty() {
            return Err(CasError::missing_parameter("pgt"));
        }
        if target_service.is_empty() {
            return Err(CasError::missing_parameter("targetService"));
        }

        // The PGT stays in the store; it may be used until it expires.
        let granting = match self.store().get_ticket(&TicketId::from(pgt)) {
            Ok(Some(ticket)) => ticket,
            Ok(None) => return Err(CasError::bad_pgt(format!("PGT '{pgt}' not recognized"))),
            Err(e) => {
                warn!(pgt, error = %e, "ticket store lookup failed");
                return Err(CasError::bad_pgt(format!("PGT '{pgt}' not recognized")));
            }
        };

        if !granting.is_proxy_granting_ticket() {
            return Err(CasError::bad_pgt(format!(
                "Ticket '{pgt}' is a {} and not a proxy-granting ticket",
                granting.ticket_type
            )));
        }
        if self.factory().is_expired_at(&granting, now) {
            return Err(CasError::bad_pgt(format!("PGT '{pgt}' has expired")));
        }

        let proxy_ticket = self.factory().create_proxy_ticket(target_service, &granting, now);
        self.store().add_ticket(&proxy_ticket).map_err(|e| {
            warn!(pgt, error = %e, "cannot store proxy ticket");
            CasError::bad_pgt(format!("Unable to issue a proxy ticket for PGT '{pgt}'"))
        })?;

        info!(ticket_id = %proxy_ticket.id, target_service, "proxy ticket issued");
        Ok(proxy_ticket)
    }
}

fn is_https(url: &str) -> bool {
    url.get(..8).is_some_and(|scheme| scheme.eq_ignore_ascii_case("https://"))
}

/// Append `name=value` to the query of `url`, keeping any fragment last.
fn append_query_parameter(url: &str, name: &str, value: &str) -> String {
    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };

    let separator = if base.ends_with('?') || base.ends_with('&') {
        ""
    } else if base.contains('?') {
        "&"
    } else {
        "?"
    };

    let mut out = format!("{base}{separator}{name}={}", urlencoding::encode(value));
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}
