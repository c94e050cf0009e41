use crate::notify::NotificationPayload;
use crate::util::{validate_url, UrlValidationError};
use axum::http::{header, HeaderMap, Method};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Rejections of an inbound request body, raised before any state changes.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("the wrong method was used: {0}")]
    Method(Method),

    #[error("the request does not contain a JSON payload")]
    ContentType,

    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no feed sources given")]
    NoSources,

    #[error("invalid feed URL '{url}': {source}")]
    InvalidSource {
        url: String,
        source: UrlValidationError,
    },

    #[error("poll interval must be greater than zero")]
    ZeroInterval,

    #[error("no messages to send")]
    NoItems,

    #[error("invalid webhook URL: {0}")]
    InvalidWebhook(UrlValidationError),
}

/// Accepts only `POST` with an `application/json` content type (parameters
/// such as `charset` allowed).
pub fn require_json_post(method: &Method, headers: &HeaderMap) -> Result<(), IntakeError> {
    if method != Method::POST {
        return Err(IntakeError::Method(method.clone()));
    }

    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("application/json"));

    if is_json {
        Ok(())
    } else {
        Err(IntakeError::ContentType)
    }
}

/// Body of `POST /config`.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub rss_feeds: Vec<String>,
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
}

impl FeedConfig {
    /// Decodes and validates a configuration body. Source URLs come back
    /// trimmed, in their original order, duplicates kept.
    pub fn parse(body: &[u8]) -> Result<Self, IntakeError> {
        let mut config: FeedConfig = serde_json::from_slice(body)?;

        if config.rss_feeds.is_empty() {
            return Err(IntakeError::NoSources);
        }
        if config.poll_interval_secs == Some(0) {
            return Err(IntakeError::ZeroInterval);
        }

        for url in &mut config.rss_feeds {
            validate_url(url).map_err(|source| IntakeError::InvalidSource {
                url: url.clone(),
                source,
            })?;
            *url = url.trim().to_string();
        }

        Ok(config)
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_secs.map(Duration::from_secs)
    }
}

/// Decodes and validates a `POST /push` body.
pub fn parse_notification(body: &[u8]) -> Result<NotificationPayload, IntakeError> {
    let payload: NotificationPayload = serde_json::from_slice(body)?;
    if payload.items.is_empty() {
        return Err(IntakeError::NoItems);
    }
    validate_url(&payload.webhook_url).map_err(IntakeError::InvalidWebhook)?;
    Ok(payload)
}
