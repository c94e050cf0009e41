use crate::feed::parser::parse_feed;
use crate::feed::types::{Feed, FeedSource, Snapshot};
use async_trait::async_trait;
use futures::future::try_join_all;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

const MAX_RETRIES: u32 = 3;
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching and parsing a single feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Feed could not be parsed as RSS, Atom or JSON Feed
    #[error("Parse error: {0}")]
    Parse(String),
    /// Server returned 429 Too Many Requests after max retries
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// A fetch failure tied to the source that caused it. Fails the whole
/// [`fetch_all`] call.
#[derive(Debug, Error)]
#[error("Failed to fetch {url}: {source}")]
pub struct SourceFetchError {
    pub url: FeedSource,
    #[source]
    pub source: FetchError,
}

/// Turns a feed URL into a [`Feed`].
///
/// Implementations must be cancel-safe: [`fetch_all`] drops the futures of
/// sibling fetches as soon as one of them fails.
#[async_trait]
pub trait FeedParser: Send + Sync {
    async fn parse_url(&self, url: &str) -> Result<Feed, FetchError>;
}

/// Fetches every source concurrently and returns them as one [`Snapshot`].
///
/// Output position `i` holds the feed of `sources[i]` regardless of
/// completion order. The first failure cancels the fetches still in flight
/// and no partial snapshot is produced.
pub async fn fetch_all<P>(parser: &P, sources: &[FeedSource]) -> Result<Snapshot, SourceFetchError>
where
    P: FeedParser + ?Sized,
{
    let fetches = sources.iter().map(|url| async move {
        parser
            .parse_url(url)
            .await
            .map_err(|source| SourceFetchError {
                url: url.clone(),
                source,
            })
    });

    let feeds = try_join_all(fetches).await?;
    tracing::debug!(feeds = feeds.len(), "Fetched all feed sources");
    Ok(Snapshot::new(feeds))
}

/// [`FeedParser`] over HTTP with `reqwest`, parsing with `feed-rs`.
///
/// - 429 and 5xx responses are retried with exponential backoff (up to 3 retries)
/// - other non-2xx responses fail immediately
/// - bodies are limited to 10MB; truncated bodies are retried
#[derive(Debug, Clone)]
pub struct HttpFeedParser {
    client: reqwest::Client,
    timeout: Duration,
    retry_base: Duration,
}

impl HttpFeedParser {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            retry_base: Duration::from_secs(1),
        }
    }

    /// Overrides the first backoff delay (doubled on each retry).
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    fn backoff(&self, retry_count: u32) -> Duration {
        self.retry_base.saturating_mul(2u32.pow(retry_count))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut retry_count = 0;

        loop {
            // One deadline per attempt, covering the body as well as the headers
            let deadline = Instant::now() + self.timeout;
            let response = tokio::time::timeout_at(deadline, self.client.get(url).send())
                .await
                .map_err(|_| FetchError::Timeout)?
                .map_err(FetchError::Network)?;

            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if retry_count >= MAX_RETRIES {
                    return Err(FetchError::RateLimited(MAX_RETRIES));
                }
                let delay = self.backoff(retry_count);
                tracing::warn!(
                    feed = %url,
                    retry = retry_count,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                retry_count += 1;
                continue;
            }

            if status.is_server_error() {
                if retry_count >= MAX_RETRIES {
                    return Err(FetchError::HttpStatus(status.as_u16()));
                }
                let delay = self.backoff(retry_count);
                tracing::warn!(
                    feed = %url,
                    status = %status,
                    retry = retry_count,
                    delay_ms = delay.as_millis() as u64,
                    "Server error, retrying after delay"
                );
                tokio::time::sleep(delay).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::HttpStatus(status.as_u16()));
            }

            let body = tokio::time::timeout_at(deadline, read_limited_bytes(response, MAX_FEED_SIZE))
                .await
                .map_err(|_| FetchError::Timeout)?;
            match body {
                Ok(bytes) => return Ok(bytes),
                Err(FetchError::IncompleteResponse { expected, received }) => {
                    if retry_count >= MAX_RETRIES {
                        return Err(FetchError::IncompleteResponse { expected, received });
                    }
                    let delay = self.backoff(retry_count);
                    tracing::debug!(
                        feed = %url,
                        expected = expected,
                        received = received,
                        attempt = retry_count + 1,
                        "Retrying incomplete download"
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl FeedParser for HttpFeedParser {
    async fn parse_url(&self, url: &str) -> Result<Feed, FetchError> {
        let bytes = self.fetch_bytes(url).await?;
        let feed = parse_feed(url, &bytes).map_err(|e| FetchError::Parse(e.to_string()))?;
        tracing::debug!(feed = %url, items = feed.items.len(), "Parsed feed");
        Ok(feed)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
