use crate::feed::types::{Feed, Item, ItemImage};
use feed_rs::parser;
use sha2::{Digest, Sha256};

/// Parses RSS/Atom/JSON Feed bytes into a [`Feed`] for `source`.
pub fn parse_feed(source: &str, bytes: &[u8]) -> Result<Feed, parser::ParseFeedError> {
    let feed = parser::parse(bytes)?;

    let items: Vec<Item> = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry.links.first().map(|l| l.href.clone());
            let published = entry.published.or(entry.updated).map(|dt| dt.timestamp());
            let title = entry.title.map(|t| t.content);
            let description = entry.summary.map(|s| s.content);
            let content = entry.content.and_then(|c| c.body);
            let image = entry
                .media
                .iter()
                .flat_map(|m| m.thumbnails.iter())
                .next()
                .map(|thumb| ItemImage {
                    url: thumb.image.uri.clone(),
                    title: thumb.image.title.clone(),
                });

            let existing_id = if entry.id.is_empty() {
                None
            } else {
                Some(entry.id.as_str())
            };
            let key = item_key(link.as_deref(), existing_id, title.as_deref(), published);

            Item {
                key,
                title,
                description,
                content,
                image,
            }
        })
        .collect();

    Ok(Feed {
        source: source.to_string(),
        title: feed.title.map(|t| t.content),
        items,
    })
}

/// Identity of an item: its link, else its feed-provided id, else a hash of
/// what is left.
fn item_key(
    link: Option<&str>,
    existing_id: Option<&str>,
    title: Option<&str>,
    published: Option<i64>,
) -> String {
    for candidate in [link, existing_id].into_iter().flatten() {
        let trimmed = candidate.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let input = format!(
        "{}|{}",
        title.unwrap_or(""),
        published.map(|p| p.to_string()).unwrap_or_default()
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}
