use super::{post_json, DispatchError, NotificationPayload};
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;

/// Discord rejects messages whose `content` is longer than this (in characters).
pub const DISCORD_MAX_CONTENT: usize = 2000;

/// Body of a Discord webhook execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscordMessage {
    pub content: String,
}

/// Renders one link per line, dropping whole lines once the message would
/// exceed [`DISCORD_MAX_CONTENT`]. A single oversized link is cut.
pub fn render_message(items: &[String]) -> DiscordMessage {
    let mut content = String::new();
    let mut len = 0;
    let mut rendered = 0;

    for item in items {
        let item_len = item.chars().count();
        let separator = usize::from(!content.is_empty());

        if len + separator + item_len > DISCORD_MAX_CONTENT {
            if content.is_empty() {
                content = item.chars().take(DISCORD_MAX_CONTENT).collect();
            } else {
                tracing::debug!(
                    dropped = items.len() - rendered,
                    "Discord message limit reached, dropping remaining links"
                );
            }
            break;
        }

        if separator == 1 {
            content.push('\n');
        }
        content.push_str(item);
        len += separator + item_len;
        rendered += 1;
    }

    DiscordMessage { content }
}

/// Forwards [`NotificationPayload`]s to their Discord webhook.
#[derive(Debug, Clone)]
pub struct DiscordRelay {
    client: reqwest::Client,
    timeout: Duration,
}

impl DiscordRelay {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Posts the rendered message to `payload.webhook_url` and returns the
    /// webhook's status code.
    pub async fn push(&self, payload: &NotificationPayload) -> Result<StatusCode, DispatchError> {
        let message = render_message(&payload.items);
        let body = serde_json::to_vec(&message)?;

        let (status, text) =
            post_json(&self.client, &payload.webhook_url, body, self.timeout).await?;
        tracing::info!(
            status = status.as_u16(),
            items = payload.items.len(),
            response = %text,
            "Discord webhook responded"
        );
        Ok(status)
    }
}
