//! Feed poller: fetches a set of RSS/Atom sources on a fixed cadence, diffs
//! them against the previous snapshot and pushes new item links to a
//! notification webhook.

pub mod api;
pub mod cache;
pub mod config;
pub mod diff;
pub mod error;
pub mod feed;
pub mod notify;
pub mod poller;
pub mod util;
