//! Session-info collaborator: `GET {base}/api/sessioninfo/{id}`.
//!
//! The response seeds a session: its title and document, whether the caller
//! owns it, the commands recorded so far, the page the owner was last on and
//! when it ended. Field names follow the service (`upload_id`, `owner`,
//! `cmds`, `ended`, `page`); the descriptive names are accepted as aliases.

#[cfg(test)]
#[path = "info_test.rs"]
mod tests;

use commands::{Command, PageNumber, Timestamp};
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use serde::{Deserialize, Deserializer};
use time::format_description::well_known::Rfc3339;
use tracing::{debug, warn};

use crate::config::ClientConfig;

#[derive(Debug, thiserror::Error)]
pub enum InfoError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("session info request returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid session info: {0}")]
    Decode(#[from] serde_json::Error),
}

/// What the service knows about a session at join time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionInfo {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "upload_id", alias = "documentId", default)]
    pub document_id: String,
    #[serde(rename = "owner", alias = "isOwner", default)]
    pub is_owner: bool,
    #[serde(rename = "cmds", alias = "commandLog", default, deserialize_with = "lenient_commands")]
    pub commands: Vec<Command>,
    #[serde(rename = "ended", alias = "endedAt", default, deserialize_with = "optional_timestamp")]
    pub ended_at: Option<Timestamp>,
    #[serde(rename = "page", alias = "currentPage", default, deserialize_with = "optional_page")]
    pub current_page: Option<PageNumber>,
}

impl SessionInfo {
    /// Parse a session-info response body.
    ///
    /// # Errors
    ///
    /// Returns [`InfoError::Decode`] if the body is not a session-info object.
    pub fn from_json(body: &str) -> Result<Self, InfoError> {
        Ok(serde_json::from_str(body)?)
    }
}

/// Commands that fail validation are skipped; they never reach the log.
fn lenient_commands<'de, D>(deserializer: D) -> Result<Vec<Command>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    let mut commands = Vec::with_capacity(raw.len());
    for (index, value) in raw.into_iter().enumerate() {
        match serde_json::from_value::<Command>(value) {
            Ok(command) => commands.push(command),
            Err(e) => warn!(index, error = %e, "skipping invalid logged command"),
        }
    }
    Ok(commands)
}

/// Absent, `null` and `""` all mean "not ended".
fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(text) if !text.trim().is_empty() => Timestamp::parse(text.trim(), &Rfc3339)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

/// The service reports `0` when no page has been visited yet.
fn optional_page<'de, D>(deserializer: D) -> Result<Option<PageNumber>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw.and_then(|page| PageNumber::new(page).ok()))
}

/// HTTP client for the session-info endpoint.
#[derive(Debug, Clone)]
pub struct SessionInfoClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl SessionInfoClient {
    /// Build a client, attaching the configured session cookie to every request.
    ///
    /// # Errors
    ///
    /// Returns [`InfoError`] if the cookie is not a valid header value or the
    /// HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, InfoError> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = &config.session_cookie {
            headers.insert(COOKIE, HeaderValue::from_str(cookie)?);
        }
        let client = reqwest::Client::builder().default_headers(headers).build()?;
        Ok(Self { client, config })
    }

    /// Fetch the info for `session_id`.
    ///
    /// # Errors
    ///
    /// Returns [`InfoError`] on transport failure, a non-success status or a
    /// malformed body.
    pub async fn fetch(&self, session_id: &str) -> Result<SessionInfo, InfoError> {
        let url = self.config.session_info_url(session_id);
        debug!(%url, "fetching session info");
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(InfoError::Status { status: status.as_u16(), body });
        }
        SessionInfo::from_json(&body)
    }
}
