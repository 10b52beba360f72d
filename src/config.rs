//! Client and listener configuration.
//!
//! Defaults can be overridden from `TXNWIRE_*` environment variables:
//! `TXNWIRE_CLIENT_ID`, `TXNWIRE_CONNECT_TIMEOUT_MS`, `TXNWIRE_REQUEST_TIMEOUT_MS`,
//! `TXNWIRE_LISTEN_ADDR`.

use std::time::Duration;

/// Positive millisecond value from `name`. Zero and unparsable values are
/// ignored so the default applies.
fn env_millis(name: &str) -> Option<Duration> {
    let raw = std::env::var(name).ok()?;
    match raw.parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => {
            tracing::warn!(variable = name, value = %raw, "ignoring invalid timeout, using default");
            None
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Sent in every request header; `None` encodes as a null string.
    pub client_id: Option<String>,
    /// Zero disables the bound.
    pub connect_timeout: Duration,
    /// Applied to socket reads and writes of one round trip. Zero disables
    /// the bound.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: Some("txnwire".to_string()),
            connect_timeout: Duration::from_millis(1_000),
            request_timeout: Duration::from_millis(30_000),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            client_id: std::env::var("TXNWIRE_CLIENT_ID")
                .ok()
                .or(defaults.client_id),
            connect_timeout: env_millis("TXNWIRE_CONNECT_TIMEOUT_MS")
                .unwrap_or(defaults.connect_timeout),
            request_timeout: env_millis("TXNWIRE_REQUEST_TIMEOUT_MS")
                .unwrap_or(defaults.request_timeout),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9092".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            listen_addr: std::env::var("TXNWIRE_LISTEN_ADDR")
                .unwrap_or_else(|_| Self::default().listen_addr),
        }
    }
}
