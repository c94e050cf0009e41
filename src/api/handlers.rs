use super::intake::{parse_notification, require_json_post, FeedConfig};
use super::AppState;
use crate::error::AppResult;
use crate::feed::{fetch_all, ItemRecord};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::Json;
use serde_json::{json, Value};

/// Replaces the polled sources and restarts the poller.
///
/// Method and content type are checked before the body is read, and the
/// body is fully validated before the scheduler is touched.
pub async fn configure(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<StatusCode> {
    tracing::info!("Accepted configuration request");
    require_json_post(&method, &headers)?;
    let config = FeedConfig::parse(&body)?;
    let interval = config.poll_interval().unwrap_or(state.default_interval);

    let scheduler = &state.scheduler;
    tracing::info!(
        sources = config.rss_feeds.len(),
        interval_secs = interval.as_secs(),
        "Applying new feed configuration"
    );
    scheduler
        .restart_with(interval, scheduler.cycle().set_sources(config.rss_feeds))
        .await?;

    Ok(StatusCode::OK)
}

/// Serves the cached items as flat records.
///
/// Before the first cycle has published, the configured sources are fetched
/// on the spot; that result is returned but not cached.
pub async fn rss(State(state): State<AppState>) -> AppResult<Json<Vec<ItemRecord>>> {
    let cycle = state.scheduler.cycle();

    if let Some(snapshot) = cycle.cache().load().await {
        return Ok(Json(snapshot.to_records()));
    }

    tracing::info!("Feed cache is empty, fetching sources on demand");
    let sources = cycle.sources().await;
    let snapshot = fetch_all(cycle.parser(), &sources).await?;
    Ok(Json(snapshot.to_records()))
}

pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Relays a notification payload to its Discord webhook and answers with
/// the webhook's status.
pub async fn push(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<StatusCode> {
    require_json_post(&method, &headers)?;
    let payload = parse_notification(&body)?;
    let status = state.relay.push(&payload).await?;
    Ok(StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY))
}
