use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A feed URL as configured by the user. Duplicates are allowed and each
/// one is fetched independently.
pub type FeedSource = String;

/// Image attached to a feed item (media thumbnail or enclosure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemImage {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A single entry of a feed.
///
/// `key` is the identity used for change detection: two items with the same
/// key are the same item, whatever their payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub key: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub image: Option<ItemImage>,
}

impl Item {
    /// Item with only a key, mostly useful in tests.
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: None,
            description: None,
            content: None,
            image: None,
        }
    }
}

/// Result of fetching one [`FeedSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub source: FeedSource,
    pub title: Option<String>,
    pub items: Vec<Item>,
}

impl Feed {
    pub fn new(source: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            source: source.into(),
            title: None,
            items,
        }
    }
}

/// Every feed from one successful fetch, positionally aligned with the
/// source list it was fetched from.
///
/// A snapshot only exists fully populated: the fetcher never builds one out
/// of partial results.
#[derive(Debug, Clone)]
pub struct Snapshot {
    feeds: Vec<Feed>,
    fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(feeds: Vec<Feed>) -> Self {
        Self {
            feeds,
            fetched_at: Utc::now(),
        }
    }

    pub fn feeds(&self) -> &[Feed] {
        &self.feeds
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Iterates every item key in feed-then-item order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.feeds
            .iter()
            .flat_map(|feed| feed.items.iter().map(|item| item.key.as_str()))
    }

    pub fn item_count(&self) -> usize {
        self.feeds.iter().map(|feed| feed.items.len()).sum()
    }

    /// Flattens the snapshot into the records served by the read endpoint.
    pub fn to_records(&self) -> Vec<ItemRecord> {
        self.feeds
            .iter()
            .flat_map(|feed| feed.items.iter().map(ItemRecord::from))
            .collect()
    }
}

/// Flat, serializable view of an [`Item`]. Absent fields are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ItemImage>,
}

impl From<&Item> for ItemRecord {
    fn from(item: &Item) -> Self {
        Self {
            title: item.title.clone(),
            description: item.description.clone(),
            content: item.content.clone(),
            link: item.key.clone(),
            image: item.image.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_follow_feed_then_item_order() {
        let snapshot = Snapshot::new(vec![
            Feed::new("a", vec![Item::with_key("1"), Item::with_key("2")]),
            Feed::new("b", vec![]),
            Feed::new("c", vec![Item::with_key("3")]),
        ]);

        let keys: Vec<&str> = snapshot.keys().collect();
        assert_eq!(keys, vec!["1", "2", "3"]);
        assert_eq!(snapshot.item_count(), 3);
    }

    #[test]
    fn test_record_omits_absent_fields() {
        let mut item = Item::with_key("https://example.com/1");
        item.title = Some("Hello".to_string());

        let json = serde_json::to_value(ItemRecord::from(&item)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "title": "Hello", "link": "https://example.com/1" })
        );
    }

    #[test]
    fn test_to_records_flattens_all_feeds() {
        let snapshot = Snapshot::new(vec![
            Feed::new("a", vec![Item::with_key("1")]),
            Feed::new("b", vec![Item::with_key("2"), Item::with_key("3")]),
        ]);

        let links: Vec<String> = snapshot.to_records().into_iter().map(|r| r.link).collect();
        assert_eq!(links, vec!["1", "2", "3"]);
    }
}
