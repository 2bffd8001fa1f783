//! Client configuration parsed from environment variables.

use std::time::Duration;

use crate::transport::Backoff;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_RECONNECT_INITIAL_MS: u64 = 1000;
pub const DEFAULT_RECONNECT_MAX_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base URL `{0}` (expected http:// or https://)")]
    InvalidBaseUrl(String),
    #[error("reconnect delay {initial_ms}ms exceeds maximum {max_ms}ms")]
    ReconnectRange { initial_ms: u64, max_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    pub session_cookie: Option<String>,
    pub reconnect: Backoff,
}

impl ClientConfig {
    /// Config for the service at `base_url` with default reconnect timing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] unless the URL is `http://` or `https://`.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self { base_url: normalize_base_url(base_url)?, session_cookie: None, reconnect: Backoff::default() })
    }

    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `SLIDECAST_BASE_URL`: default `http://127.0.0.1:8080`
    /// - `SLIDECAST_SESSION_COOKIE`: sent on session-info and relay requests
    /// - `SLIDECAST_RECONNECT_INITIAL_MS`: default 1000
    /// - `SLIDECAST_RECONNECT_MAX_MS`: default 10000
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a malformed base URL or an initial
    /// reconnect delay above the maximum.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var("SLIDECAST_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
        let session_cookie = std::env::var("SLIDECAST_SESSION_COOKIE")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let initial_ms = env_parse("SLIDECAST_RECONNECT_INITIAL_MS", DEFAULT_RECONNECT_INITIAL_MS);
        let max_ms = env_parse("SLIDECAST_RECONNECT_MAX_MS", DEFAULT_RECONNECT_MAX_MS);
        if initial_ms > max_ms {
            return Err(ConfigError::ReconnectRange { initial_ms, max_ms });
        }

        Ok(Self {
            base_url: normalize_base_url(&base_url)?,
            session_cookie,
            reconnect: Backoff::new(Duration::from_millis(initial_ms), Duration::from_millis(max_ms)),
        })
    }

    /// Replace the base URL.
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
        self.base_url = normalize_base_url(base_url)?;
        Ok(self)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET` endpoint describing session `session_id`.
    #[must_use]
    pub fn session_info_url(&self, session_id: &str) -> String {
        format!("{}/api/sessioninfo/{session_id}", self.base_url)
    }

    /// Websocket relay endpoint: `ws://` for `http://`, `wss://` for `https://`.
    #[must_use]
    pub fn relay_url(&self) -> String {
        if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}/api/ws")
        } else {
            let rest = self.base_url.strip_prefix("http://").unwrap_or(&self.base_url);
            format!("ws://{rest}/api/ws")
        }
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let host = trimmed.strip_prefix("https://").or_else(|| trimmed.strip_prefix("http://"));
    match host {
        Some(host) if !host.is_empty() => Ok(trimmed.to_owned()),
        _ => Err(ConfigError::InvalidBaseUrl(raw.to_owned())),
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
