//! Feed sources, their parsed form, and concurrent fetching.
//!
//! - [`types`] - `Feed`, `Item` and the `Snapshot` of one successful poll
//! - [`parser`] - bytes to `Feed` using the `feed-rs` crate
//! - [`fetcher`] - the [`FeedParser`] seam and all-or-nothing [`fetch_all`]
//!
//! # Example
//!
//! ```ignore
//! use rss_poller::feed::{fetch_all, HttpFeedParser};
//!
//! let parser = HttpFeedParser::new(reqwest::Client::new(), Duration::from_secs(30));
//! let snapshot = fetch_all(&parser, &sources).await?;
//! ```

mod fetcher;
mod parser;
mod types;

pub use fetcher::{fetch_all, FeedParser, FetchError, HttpFeedParser, SourceFetchError};
pub use parser::parse_feed;
pub use types::{Feed, FeedSource, Item, ItemImage, ItemRecord, Snapshot};
