//! Relay configuration
//!
//! Everything the relay needs is gathered once at startup into a
//! [`Config`] and handed to each component at construction time.

use crate::error::{Error, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Account used for both outbound and inbound mail sessions.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email_address: String,
    pub email_password: String,
}

/// Inbound mail (IMAP over implicit TLS) settings.
#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub mailbox: String,
    /// Skip certificate verification. Only meant for self-signed
    /// servers such as local bridges and test fixtures.
    pub accept_invalid_certs: bool,
}

impl Default for ImapConfig {
    fn default() -> Self {
        Self {
            host: "imap.gmail.com".to_string(),
            port: 993,
            mailbox: "INBOX".to_string(),
            accept_invalid_certs: false,
        }
    }
}

/// Outbound mail (SMTP with STARTTLS) settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
        }
    }
}

/// Recipe search API settings.
#[derive(Debug, Clone)]
pub struct RecipeApiConfig {
    pub base_url: String,
    pub api_key: String,
}

impl RecipeApiConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.spoonacular.com";

    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }
}

/// Listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Connections handled at once; arrivals beyond this are turned away.
    pub max_connections: usize,
    pub max_request_bytes: usize,
    /// Upper bound on the `limit` a fetch request may ask for.
    pub max_fetch_limit: usize,
    pub read_timeout: Duration,
    /// Deadline applied to each mail or recipe API call.
    pub upstream_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 65432,
            max_connections: 64,
            max_request_bytes: 1024,
            max_fetch_limit: Self::DEFAULT_MAX_FETCH_LIMIT,
            read_timeout: Duration::from_secs(30),
            upstream_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    pub const DEFAULT_MAX_FETCH_LIMIT: usize = 50;
    pub const REQUEST_BYTES_CEILING: usize = 1024 * 1024;

    /// Check the limits that size buffers and the connection semaphore.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first field out of range.
    pub fn validate(&self) -> Result<()> {
        if !(1..=Semaphore::MAX_PERMITS).contains(&self.max_connections) {
            return Err(Error::Config(format!(
                "max_connections must be between 1 and {}, got {}",
                Semaphore::MAX_PERMITS,
                self.max_connections
            )));
        }
        if !(1..=Self::REQUEST_BYTES_CEILING).contains(&self.max_request_bytes) {
            return Err(Error::Config(format!(
                "max_request_bytes must be between 1 and {}, got {}",
                Self::REQUEST_BYTES_CEILING,
                self.max_request_bytes
            )));
        }
        if self.max_fetch_limit == 0 {
            return Err(Error::Config("max_fetch_limit must be at least 1".to_string()));
        }
        Ok(())
    }

    /// `host:port` string suitable for binding.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Complete relay configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub imap: ImapConfig,
    pub smtp: SmtpConfig,
    pub recipe_api: RecipeApiConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `EMAIL_ADDRESS`
    /// - `EMAIL_PASSWORD`
    /// - `SPOONACULAR_API_KEY`
    ///
    /// Optional (with defaults):
    /// - `IMAP_HOST` (default: `imap.gmail.com`), `IMAP_PORT` (default: `993`)
    /// - `IMAP_MAILBOX` (default: `INBOX`)
    /// - `IMAP_ACCEPT_INVALID_CERTS` (default: `false`)
    /// - `SMTP_HOST` (default: `smtp.gmail.com`), `SMTP_PORT` (default: `587`)
    /// - `SPOONACULAR_BASE_URL` (default: `https://api.spoonacular.com`)
    /// - `RELAY_HOST` (default: `127.0.0.1`), `RELAY_PORT` (default: `65432`)
    /// - `RELAY_MAX_CONNECTIONS` (default: `64`)
    /// - `RELAY_MAX_REQUEST_BYTES` (default: `1024`, at most 1 MiB)
    /// - `RELAY_MAX_FETCH_LIMIT` (default: `50`)
    /// - `RELAY_READ_TIMEOUT_SECS`, `RELAY_UPSTREAM_TIMEOUT_SECS` (default: `30`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required =
            |key: &str| lookup(key).ok_or_else(|| Error::Config(format!("{key} not set")));

        let imap_defaults = ImapConfig::default();
        let smtp_defaults = SmtpConfig::default();
        let server_defaults = ServerConfig::default();

        let config = Self {
            credentials: Credentials {
                email_address: required("EMAIL_ADDRESS")?,
                email_password: required("EMAIL_PASSWORD")?,
            },
            imap: ImapConfig {
                host: lookup("IMAP_HOST").unwrap_or(imap_defaults.host),
                port: parse_or(&lookup, "IMAP_PORT", imap_defaults.port)?,
                mailbox: lookup("IMAP_MAILBOX").unwrap_or(imap_defaults.mailbox),
                accept_invalid_certs: parse_or(
                    &lookup,
                    "IMAP_ACCEPT_INVALID_CERTS",
                    imap_defaults.accept_invalid_certs,
                )?,
            },
            smtp: SmtpConfig {
                host: lookup("SMTP_HOST").unwrap_or(smtp_defaults.host),
                port: parse_or(&lookup, "SMTP_PORT", smtp_defaults.port)?,
            },
            recipe_api: RecipeApiConfig {
                base_url: lookup("SPOONACULAR_BASE_URL")
                    .unwrap_or_else(|| RecipeApiConfig::DEFAULT_BASE_URL.to_string()),
                api_key: required("SPOONACULAR_API_KEY")?,
            },
            server: ServerConfig {
                host: lookup("RELAY_HOST").unwrap_or(server_defaults.host),
                port: parse_or(&lookup, "RELAY_PORT", server_defaults.port)?,
                max_connections: parse_or(
                    &lookup,
                    "RELAY_MAX_CONNECTIONS",
                    server_defaults.max_connections,
                )?,
                max_request_bytes: parse_or(
                    &lookup,
                    "RELAY_MAX_REQUEST_BYTES",
                    server_defaults.max_request_bytes,
                )?,
                max_fetch_limit: parse_or(
                    &lookup,
                    "RELAY_MAX_FETCH_LIMIT",
                    server_defaults.max_fetch_limit,
                )?,
                read_timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "RELAY_READ_TIMEOUT_SECS",
                    server_defaults.read_timeout.as_secs(),
                )?),
                upstream_timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "RELAY_UPSTREAM_TIMEOUT_SECS",
                    server_defaults.upstream_timeout.as_secs(),
                )?),
            },
        };
        config.server.validate()?;
        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid {key}: {e}")))
    })
}
