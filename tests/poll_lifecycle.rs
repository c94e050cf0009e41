//! End-to-end poll cycles against mock feed and notify servers.
//!
//! Feeds are served over HTTP by wiremock and parsed by the real
//! `HttpFeedParser`, so these tests cover fetch, diff, dispatch and publish
//! together.

mod common;

use common::{mount_feed, poll_cycle};
use pretty_assertions::assert_eq;
use rss_poller::poller::DispatchOutcome;
use rss_poller::notify::NotifyTarget;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOOK: &str = "https://discord.example.com/api/webhooks/1/abc";

async fn mount_push(server: &MockServer, items: &[&str]) {
    Mock::given(method("POST"))
        .and(path("/push"))
        .and(body_json(json!({ "feed_url": items, "webhook_url": HOOK })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_new_items_notified_once_then_only_additions() {
    let feeds = MockServer::start().await;
    let notify = MockServer::start().await;

    mount_feed(&feeds, "/a", &["https://a.example.com/1", "https://a.example.com/2"]).await;
    mount_feed(&feeds, "/b", &["https://b.example.com/3"]).await;
    mount_push(
        &notify,
        &[
            "https://a.example.com/1",
            "https://a.example.com/2",
            "https://b.example.com/3",
        ],
    )
    .await;

    let target = NotifyTarget::new(format!("{}/push", notify.uri()), HOOK);
    let cycle = poll_cycle(
        Some(target),
        vec![format!("{}/a", feeds.uri()), format!("{}/b", feeds.uri())],
    )
    .await;

    let first = cycle.run().await.unwrap();
    assert_eq!(first.new_items.len(), 3);
    assert_eq!(first.dispatch, DispatchOutcome::Delivered(reqwest::StatusCode::OK));
    notify.verify().await;

    // Source A gains one item
    feeds.reset().await;
    notify.reset().await;
    mount_feed(
        &feeds,
        "/a",
        &[
            "https://a.example.com/1",
            "https://a.example.com/2",
            "https://a.example.com/4",
        ],
    )
    .await;
    mount_feed(&feeds, "/b", &["https://b.example.com/3"]).await;
    mount_push(&notify, &["https://a.example.com/4"]).await;

    let second = cycle.run().await.unwrap();
    assert_eq!(second.new_items, vec!["https://a.example.com/4"]);
    notify.verify().await;

    let cached: Vec<String> = cycle
        .cache()
        .load()
        .await
        .unwrap()
        .keys()
        .map(str::to_owned)
        .collect();
    assert_eq!(
        cached,
        vec![
            "https://a.example.com/1",
            "https://a.example.com/2",
            "https://a.example.com/4",
            "https://b.example.com/3",
        ]
    );
}

#[tokio::test]
async fn test_unchanged_feeds_send_nothing() {
    let feeds = MockServer::start().await;
    let notify = MockServer::start().await;

    mount_feed(&feeds, "/a", &["https://a.example.com/1"]).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&notify)
        .await;

    let target = NotifyTarget::new(format!("{}/push", notify.uri()), HOOK);
    let cycle = poll_cycle(Some(target), vec![format!("{}/a", feeds.uri())]).await;

    cycle.run().await.unwrap();
    let second = cycle.run().await.unwrap();
    assert_eq!(second.dispatch, DispatchOutcome::NoNewItems);
}

#[tokio::test]
async fn test_failing_source_keeps_previous_snapshot() {
    let feeds = MockServer::start().await;
    mount_feed(&feeds, "/a", &["https://a.example.com/1"]).await;
    mount_feed(&feeds, "/b", &["https://b.example.com/2"]).await;

    let cycle = poll_cycle(
        None,
        vec![format!("{}/a", feeds.uri()), format!("{}/b", feeds.uri())],
    )
    .await;
    cycle.run().await.unwrap();
    let before = cycle.cache().load().await.unwrap();

    feeds.reset().await;
    mount_feed(&feeds, "/a", &["https://a.example.com/1", "https://a.example.com/9"]).await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&feeds)
        .await;

    let err = cycle.run().await.unwrap_err();
    assert_eq!(err.url, format!("{}/b", feeds.uri()));

    let after = cycle.cache().load().await.unwrap();
    assert!(Arc::ptr_eq(&before, &after));
}

#[tokio::test]
async fn test_item_order_follows_source_order() {
    let feeds = MockServer::start().await;
    mount_feed(&feeds, "/a", &["https://a.example.com/1"]).await;
    mount_feed(&feeds, "/b", &["https://b.example.com/1"]).await;

    let cycle = poll_cycle(
        None,
        vec![format!("{}/b", feeds.uri()), format!("{}/a", feeds.uri())],
    )
    .await;

    let report = cycle.run().await.unwrap();
    assert_eq!(
        report.new_items,
        vec!["https://b.example.com/1", "https://a.example.com/1"]
    );
    assert_eq!(report.dispatch, DispatchOutcome::Unconfigured);
}
