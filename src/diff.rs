//! Change detection between two snapshots.

use crate::feed::Snapshot;
use std::collections::HashSet;

/// Returns the keys of items present in `candidate` but absent from `base`,
/// in feed-then-item order.
///
/// A missing `base` counts as empty, so every candidate item is new on the
/// first poll. Keys repeated inside `candidate` are each reported; the result
/// is not deduplicated.
pub fn diff(base: Option<&Snapshot>, candidate: &Snapshot) -> Vec<String> {
    let seen: HashSet<&str> = base.map(|b| b.keys().collect()).unwrap_or_default();

    candidate
        .keys()
        .filter(|key| !seen.contains(key))
        .map(str::to_owned)
        .collect()
}
