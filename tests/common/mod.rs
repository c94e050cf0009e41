//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use rss_poller::cache::FeedCache;
use rss_poller::feed::HttpFeedParser;
use rss_poller::notify::{Dispatcher, NotifyTarget};
use rss_poller::poller::PollCycle;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Minimal RSS 2.0 document whose items link to `links`, in order.
pub fn rss_body(title: &str, links: &[&str]) -> String {
    let items: String = links
        .iter()
        .map(|link| {
            format!("<item><title>Post {link}</title><link>{link}</link><description>About {link}</description></item>")
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>{title}</title><link>https://example.com</link><description>test</description>{items}</channel></rss>"#
    )
}

pub async fn mount_feed(server: &MockServer, feed_path: &str, links: &[&str]) {
    Mock::given(method("GET"))
        .and(path(feed_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(rss_body(feed_path, links), "application/rss+xml"),
        )
        .mount(server)
        .await;
}

pub fn parser() -> Arc<HttpFeedParser> {
    Arc::new(
        HttpFeedParser::new(reqwest::Client::new(), Duration::from_secs(5))
            .with_retry_base(Duration::from_millis(10)),
    )
}

pub async fn poll_cycle(target: Option<NotifyTarget>, sources: Vec<String>) -> PollCycle {
    let cycle = PollCycle::new(
        parser(),
        Dispatcher::new(reqwest::Client::new(), Duration::from_secs(5)),
        target,
        FeedCache::new(),
    );
    cycle.set_sources(sources).await;
    cycle
}
