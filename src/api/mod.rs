//! HTTP surface of the poller.
//!
//! | Route | |
//! |---|---|
//! | `POST /config` | set the feed sources and (re)start polling |
//! | `GET /rss` | current items as flat records |
//! | `GET /healthz` | liveness |
//! | `POST /push` | relay a notification payload to Discord |

mod handlers;
mod intake;

pub use intake::{parse_notification, require_json_post, FeedConfig, IntakeError};

use crate::notify::DiscordRelay;
use crate::poller::{PollCycle, Scheduler};
use axum::http::{header, HeaderValue, Method};
use axum::routing::{any, get};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<Scheduler<PollCycle>>,
    pub relay: DiscordRelay,
    /// Used when `POST /config` does not specify an interval.
    pub default_interval: Duration,
}

pub fn create_router(state: AppState, cors_origin: Option<HeaderValue>) -> Router {
    let router = Router::new()
        // Method checks happen in the handlers so rejections are 400s
        .route("/config", any(handlers::configure))
        .route("/push", any(handlers::push))
        .route("/rss", get(handlers::rss))
        .route("/healthz", get(handlers::healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match cors_origin {
        Some(origin) => router.layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        ),
        None => router,
    }
}
