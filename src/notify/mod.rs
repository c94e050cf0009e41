//! Outbound notifications.
//!
//! - [`webhook`] - the poller's dispatcher: one JSON POST per cycle with the
//!   new item links, sent to the notify service
//! - [`discord`] - the notify service side: turns that payload into a
//!   Discord webhook message

mod discord;
mod webhook;

pub use discord::{render_message, DiscordMessage, DiscordRelay, DISCORD_MAX_CONTENT};
pub use webhook::Dispatcher;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Local failure to deliver a notification. A response with a non-2xx
/// status is not a `DispatchError`; the status is returned instead.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to serialize notification: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timed out")]
    Timeout,
}

/// Body exchanged between the poller and the notify service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Links of the new items.
    #[serde(rename = "feed_url")]
    pub items: Vec<String>,
    /// Final destination, e.g. a Discord webhook URL.
    pub webhook_url: String,
}

/// Where notifications go: `sender` is the notify service the payload is
/// POSTed to, `webhook_url` is the destination it forwards to.
#[derive(Debug)]
pub struct NotifyTarget {
    sender: String,
    webhook_url: SecretString,
}

impl NotifyTarget {
    pub fn new(sender: impl Into<String>, webhook_url: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            webhook_url: SecretString::from(webhook_url.into()),
        }
    }

    /// Builds a target only when both halves are present and non-blank.
    pub fn from_parts(sender: Option<&str>, webhook_url: Option<&str>) -> Option<Self> {
        let sender = sender.map(str::trim).filter(|s| !s.is_empty())?;
        let webhook_url = webhook_url.map(str::trim).filter(|s| !s.is_empty())?;
        Some(Self::new(sender, webhook_url))
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    fn payload(&self, items: &[String]) -> NotificationPayload {
        NotificationPayload {
            items: items.to_vec(),
            webhook_url: self.webhook_url.expose_secret().to_string(),
        }
    }
}

/// POSTs `body` as JSON and returns the status plus response text, whatever
/// the status is.
async fn post_json(
    client: &reqwest::Client,
    url: &str,
    body: Vec<u8>,
    timeout: Duration,
) -> Result<(StatusCode, String), DispatchError> {
    let round_trip = async {
        let response = client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        Ok::<_, reqwest::Error>((status, text))
    };

    tokio::time::timeout(timeout, round_trip)
        .await
        .map_err(|_| DispatchError::Timeout)?
        .map_err(DispatchError::Network)
}
