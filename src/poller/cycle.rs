use super::scheduler::Cycle;
use crate::cache::FeedCache;
use crate::diff::diff;
use crate::feed::{fetch_all, FeedParser, FeedSource, SourceFetchError};
use crate::notify::{Dispatcher, NotifyTarget};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use std::sync::Arc;
use tokio::sync::RwLock;

/// What happened to the notification step of a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing new, dispatcher not called.
    NoNewItems,
    /// Sender or destination missing, dispatcher not called.
    Unconfigured,
    /// Round trip completed with this status (may be 4xx/5xx).
    Delivered(StatusCode),
    /// Local failure (connection, timeout, serialization).
    Failed(String),
}

/// Result of a cycle that got past the fetch step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub new_items: Vec<String>,
    pub dispatch: DispatchOutcome,
}

/// One fetch, diff, notify, publish pass over the configured sources.
///
/// This is the only writer of its [`FeedCache`].
pub struct PollCycle {
    parser: Arc<dyn FeedParser>,
    dispatcher: Dispatcher,
    target: Option<NotifyTarget>,
    cache: FeedCache,
    sources: RwLock<Arc<Vec<FeedSource>>>,
}

impl PollCycle {
    pub fn new(
        parser: Arc<dyn FeedParser>,
        dispatcher: Dispatcher,
        target: Option<NotifyTarget>,
        cache: FeedCache,
    ) -> Self {
        Self {
            parser,
            dispatcher,
            target,
            cache,
            sources: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Replaces the source list used from the next cycle on.
    pub async fn set_sources(&self, sources: Vec<FeedSource>) {
        *self.sources.write().await = Arc::new(sources);
    }

    pub async fn sources(&self) -> Arc<Vec<FeedSource>> {
        Arc::clone(&*self.sources.read().await)
    }

    pub fn cache(&self) -> &FeedCache {
        &self.cache
    }

    pub fn parser(&self) -> &dyn FeedParser {
        self.parser.as_ref()
    }

    /// Runs one cycle.
    ///
    /// A fetch failure aborts before anything is published, leaving the cache
    /// as it was. Once the fetch succeeds the new snapshot is always
    /// published, whatever happens to the notification.
    pub async fn run(&self) -> Result<CycleReport, SourceFetchError> {
        let sources = self.sources().await;
        let candidate = fetch_all(self.parser.as_ref(), &sources).await?;

        let base = self.cache.load().await;
        let new_items = diff(base.as_deref(), &candidate);
        tracing::info!(
            sources = sources.len(),
            items = candidate.item_count(),
            new_items = new_items.len(),
            "Fetched feeds"
        );

        let dispatch = self.notify(&new_items).await;

        let fetched_at = candidate.fetched_at();
        self.cache.publish(candidate).await;
        tracing::debug!(fetched_at = %fetched_at, "Published new snapshot");

        Ok(CycleReport {
            new_items,
            dispatch,
        })
    }

    async fn notify(&self, new_items: &[String]) -> DispatchOutcome {
        if new_items.is_empty() {
            return DispatchOutcome::NoNewItems;
        }

        let Some(target) = &self.target else {
            tracing::error!("Notification service is misconfigured, skipping notification");
            return DispatchOutcome::Unconfigured;
        };

        match self.dispatcher.send(target, new_items).await {
            Ok(status) => {
                if !status.is_success() {
                    tracing::warn!(
                        status = status.as_u16(),
                        "Notify service rejected notification"
                    );
                }
                DispatchOutcome::Delivered(status)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to send notification");
                DispatchOutcome::Failed(e.to_string())
            }
        }
    }
}

#[async_trait]
impl Cycle for PollCycle {
    async fn run_cycle(&self) {
        tracing::debug!(tick = %Utc::now(), "Poller tick");
        if let Err(e) = self.run().await {
            tracing::warn!(url = %e.url, error = %e.source, "Poll cycle aborted, cache unchanged");
        }
    }
}
