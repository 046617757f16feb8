//! Delivery of proxy-granting tickets to a client's callback URL.
//!
//! The CAS server hands the PGT id and its IOU to the `pgtUrl` given at
//! validation time; the PGT is only stored once delivery succeeds.

use std::sync::Arc;

use thiserror::Error;

use casserver_core::TicketId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("proxy callback to {url} failed: {reason}")]
pub struct CallbackError {
    pub url: String,
    pub reason: String,
}

impl CallbackError {
    pub fn new(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

pub trait ProxyCallback: Send + Sync {
    /// Hand `pgt_id` and `pgt_iou` to the client listening at `pgt_url`.
    fn deliver(&self, pgt_url: &str, pgt_id: &TicketId, pgt_iou: &str) -> Result<(), CallbackError>;
}

impl<C> ProxyCallback for Arc<C>
where
    C: ProxyCallback + ?Sized,
{
    fn deliver(&self, pgt_url: &str, pgt_id: &TicketId, pgt_iou: &str) -> Result<(), CallbackError> {
        (**self).deliver(pgt_url, pgt_id, pgt_iou)
    }
}

/// Refuses every delivery, so proxy-granting tickets are never issued.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledProxyCallback;

impl ProxyCallback for DisabledProxyCallback {
    fn deliver(&self, pgt_url: &str, _pgt_id: &TicketId, _pgt_iou: &str) -> Result<(), CallbackError> {
        Err(CallbackError::new(pgt_url, "proxy support is disabled"))
    }
}
