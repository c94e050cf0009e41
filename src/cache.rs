//! The last successfully fetched snapshot, shared between the poller and
//! HTTP readers.

use crate::feed::Snapshot;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Lock-guarded cell holding the current [`Snapshot`].
///
/// Cloning is cheap and every clone points at the same cell. Locks are held
/// only long enough to copy or swap the `Arc`, never across I/O, so a reader
/// sees either the old snapshot or the new one in full.
#[derive(Debug, Clone, Default)]
pub struct FeedCache {
    current: Arc<RwLock<Option<Arc<Snapshot>>>>,
}

impl FeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, or `None` if no cycle has published yet.
    pub async fn load(&self) -> Option<Arc<Snapshot>> {
        self.current.read().await.clone()
    }

    pub async fn is_populated(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Installs `snapshot`, returning the one it replaced.
    pub(crate) async fn publish(&self, snapshot: Snapshot) -> Option<Arc<Snapshot>> {
        let snapshot = Arc::new(snapshot);
        let mut current = self.current.write().await;
        current.replace(snapshot)
    }
}
