//! Configuration loading and representation.
//!
//! Configuration is a JSON document (see [`CasConfig`]) optionally overridden by
//! `CASSERVER_*` environment variables. Option names follow the conventional CAS
//! server module names (`attributes`, `base64attributes`, …).

use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use serde::Deserialize;
use thiserror::Error;

use casserver_core::TicketLifetimes;

pub const ENV_TICKETSTORE_CLASS: &str = "CASSERVER_TICKETSTORE_CLASS";
pub const ENV_TICKETSTORE_DIRECTORY: &str = "CASSERVER_TICKETSTORE_DIRECTORY";
pub const ENV_TICKETSTORE_PREFIX: &str = "CASSERVER_TICKETSTORE_PREFIX";
pub const ENV_REDIS_URL: &str = "CASSERVER_REDIS_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("cannot parse configuration: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Ticket store selection and backend options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TicketStoreConfig {
    /// Registry key of the backend.
    pub class: String,
    /// Filesystem backend: directory holding one file per ticket.
    pub directory: PathBuf,
    /// Cache backend: key namespace.
    pub prefix: String,
    /// Cache backend: server URL.
    pub redis_url: Option<String>,
}

impl Default for TicketStoreConfig {
    fn default() -> Self {
        Self {
            class: "filesystem".to_string(),
            directory: PathBuf::from("ticketcache"),
            prefix: String::new(),
            redis_url: None,
        }
    }
}

/// CAS server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CasConfig {
    pub ticketstore: TicketStoreConfig,

    /// Service ticket lifetime, seconds.
    pub service_ticket_expire_time: i64,
    /// Proxy ticket lifetime, seconds.
    pub proxy_ticket_expire_time: i64,
    /// Proxy-granting ticket lifetime, seconds.
    pub proxy_granting_ticket_expire_time: i64,

    /// Release attributes in validation responses.
    #[serde(rename = "attributes")]
    pub send_attributes: bool,
    /// Base64-encode every released attribute value.
    #[serde(rename = "base64attributes")]
    pub base64_encode_attributes: bool,
    /// Name of a synthetic attribute announcing the encoding choice.
    #[serde(rename = "base64_attributes_indicator_attribute")]
    pub base64_indicator_attribute: Option<String>,

    /// Prefixes of services allowed to receive tickets.
    pub legal_service_urls: Vec<String>,

    pub enable_logout: bool,
    pub skip_logout_page: bool,
    /// Page to send users to after logout when not skipping it.
    pub logged_out_url: String,
}

impl Default for CasConfig {
    fn default() -> Self {
        Self {
            ticketstore: TicketStoreConfig::default(),
            service_ticket_expire_time: 5,
            proxy_ticket_expire_time: 5,
            proxy_granting_ticket_expire_time: 3600,
            send_attributes: false,
            base64_encode_attributes: false,
            base64_indicator_attribute: None,
            legal_service_urls: Vec::new(),
            enable_logout: false,
            skip_logout_page: false,
            logged_out_url: "loggedOut".to_string(),
        }
    }
}

impl CasConfig {
    /// Parse a JSON document. Missing options take their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON file. A relative `ticketstore.directory` is resolved against
    /// the directory containing the file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut config = Self::from_json_str(&raw)?;
        if config.ticketstore.directory.is_relative() {
            if let Some(base) = path.parent() {
                config.ticketstore.directory = base.join(&config.ticketstore.directory);
            }
        }
        Ok(config)
    }

    /// Apply `CASSERVER_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(class) = lookup(ENV_TICKETSTORE_CLASS) {
            self.ticketstore.class = class;
        }
        if let Some(directory) = lookup(ENV_TICKETSTORE_DIRECTORY) {
            self.ticketstore.directory = PathBuf::from(directory);
        }
        if let Some(prefix) = lookup(ENV_TICKETSTORE_PREFIX) {
            self.ticketstore.prefix = prefix;
        }
        if let Some(url) = lookup(ENV_REDIS_URL) {
            self.ticketstore.redis_url = Some(url);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticketstore.class.trim().is_empty() {
            return Err(ConfigError::Invalid("ticketstore.class must not be empty".to_string()));
        }
        for (name, secs) in [
            ("service_ticket_expire_time", self.service_ticket_expire_time),
            ("proxy_ticket_expire_time", self.proxy_ticket_expire_time),
            ("proxy_granting_ticket_expire_time", self.proxy_granting_ticket_expire_time),
        ] {
            if secs <= 0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {secs}")));
            }
            let in_range = Duration::try_seconds(secs)
                .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
                .is_some();
            if !in_range {
                return Err(ConfigError::Invalid(format!("{name} is out of range, got {secs}")));
            }
        }
        if matches!(&self.base64_indicator_attribute, Some(name) if name.is_empty()) {
            return Err(ConfigError::Invalid(
                "base64_attributes_indicator_attribute must not be empty when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn lifetimes(&self) -> TicketLifetimes {
        TicketLifetimes {
            service_ticket: lifetime(self.service_ticket_expire_time),
            proxy_ticket: lifetime(self.proxy_ticket_expire_time),
            proxy_granting_ticket: lifetime(self.proxy_granting_ticket_expire_time),
        }
    }
}

/// Seconds to a lifetime; values beyond the representable range saturate.
fn lifetime(secs: i64) -> Duration {
    Duration::try_seconds(secs).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = CasConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CasConfig::default());
        assert_eq!(config.ticketstore.class, "filesystem");
        assert_eq!(config.lifetimes(), TicketLifetimes::default());
    }

    #[test]
    fn conventional_option_names() {
        let config = CasConfig::from_json_str(
            r#"{
                "ticketstore": { "class": "redis", "prefix": "cas", "redis_url": "redis://cache:6379" },
                "attributes": true,
                "base64attributes": true,
                "base64_attributes_indicator_attribute": "base64",
                "legal_service_urls": ["https://svc.example.org/"],
                "service_ticket_expire_time": 10
            }"#,
        )
        .unwrap();

        assert_eq!(config.ticketstore.class, "redis");
        assert_eq!(config.ticketstore.prefix, "cas");
        assert!(config.send_attributes);
        assert!(config.base64_encode_attributes);
        assert_eq!(config.base64_indicator_attribute.as_deref(), Some("base64"));
        assert_eq!(config.lifetimes().service_ticket, Duration::seconds(10));
    }

    #[test]
    fn unknown_options_are_rejected() {
        assert!(matches!(
            CasConfig::from_json_str(r#"{ "atributes": true }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn non_positive_lifetime_is_invalid() {
        assert!(matches!(
            CasConfig::from_json_str(r#"{ "service_ticket_expire_time": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn huge_lifetimes_are_invalid() {
        for secs in [i64::MAX, 9_000_000_000_000] {
            let raw = format!(r#"{{ "service_ticket_expire_time": {secs} }}"#);
            assert!(matches!(
                CasConfig::from_json_str(&raw),
                Err(ConfigError::Invalid(msg)) if msg.contains("out of range")
            ));
        }

        let raw = r#"{ "proxy_granting_ticket_expire_time": 9000000000000 }"#;
        assert!(matches!(CasConfig::from_json_str(raw), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unvalidated_huge_lifetime_does_not_panic() {
        let config = CasConfig {
            service_ticket_expire_time: i64::MAX,
            ..CasConfig::default()
        };
        assert_eq!(config.lifetimes().service_ticket, Duration::MAX);
    }

    #[test]
    fn overrides_replace_store_options() {
        let env: HashMap<&str, &str> = [
            (ENV_TICKETSTORE_CLASS, "memory"),
            (ENV_TICKETSTORE_DIRECTORY, "/var/lib/cas"),
            (ENV_TICKETSTORE_PREFIX, "p"),
        ]
        .into_iter()
        .collect();

        let config = CasConfig::default()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.ticketstore.class, "memory");
        assert_eq!(config.ticketstore.directory, PathBuf::from("/var/lib/cas"));
        assert_eq!(config.ticketstore.prefix, "p");
        assert_eq!(config.ticketstore.redis_url, None);
    }

    #[test]
    fn relative_directory_resolves_against_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("module_casserver.json");
        std::fs::write(&path, r#"{ "ticketstore": { "directory": "tickets" } }"#).unwrap();

        let config = CasConfig::from_file(&path).unwrap();
        assert_eq!(config.ticketstore.directory, dir.path().join("tickets"));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            CasConfig::from_file("/definitely/not/here.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
