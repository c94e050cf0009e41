use super::{post_json, DispatchError, NotifyTarget};
use reqwest::StatusCode;
use std::time::Duration;

/// Sends the new item links of a cycle to the notify service.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Performs exactly one POST of `items` to `target`, without retrying.
    ///
    /// An empty `items` short-circuits to `204 No Content` with no request.
    /// Any completed round trip yields the remote status, 4xx/5xx included;
    /// only serialization, connection and timeout failures are errors.
    pub async fn send(
        &self,
        target: &NotifyTarget,
        items: &[String],
    ) -> Result<StatusCode, DispatchError> {
        if items.is_empty() {
            return Ok(StatusCode::NO_CONTENT);
        }

        let body = serde_json::to_vec(&target.payload(items))?;
        tracing::info!(
            sender = %target.sender(),
            items = items.len(),
            "Sending payload to notify service"
        );

        let (status, text) = post_json(&self.client, target.sender(), body, self.timeout).await?;
        tracing::info!(status = status.as_u16(), response = %text, "Notify service responded");
        Ok(status)
    }
}
