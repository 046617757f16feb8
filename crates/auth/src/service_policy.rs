//! Which services may receive tickets.

/// Prefix allow-list of service URLs.
///
/// A service is legal when it starts with one of the configured prefixes. An
/// empty list allows nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServicePolicy {
    legal_service_urls: Vec<String>,
}

impl ServicePolicy {
    pub fn new(legal_service_urls: Vec<String>) -> Self {
        Self { legal_service_urls }
    }

    pub fn legal_service_urls(&self) -> &[String] {
        &self.legal_service_urls
    }

    pub fn is_allowed(&self, service: &str) -> bool {
        self.legal_service_urls
            .iter()
            .any(|prefix| service.starts_with(prefix.as_str()))
    }
}
