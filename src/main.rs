use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use reqwest::redirect::Policy;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rss_poller::api::{create_router, AppState};
use rss_poller::cache::FeedCache;
use rss_poller::config::Config;
use rss_poller::feed::HttpFeedParser;
use rss_poller::notify::{DiscordRelay, Dispatcher, NotifyTarget};
use rss_poller::poller::{PollCycle, Scheduler};

#[derive(Parser, Debug)]
#[command(name = "rss-poller")]
#[command(about = "Poll RSS/Atom feeds and push new items to a webhook", long_about = None)]
#[command(version)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config and LISTEN_ADDR)
    #[arg(short, long)]
    listen: Option<String>,
}

fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(to = %url, hop = attempt.previous().len() + 1, "Following redirect");
        attempt.follow()
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from '{}'", path.display()))?,
        None => Config::default(),
    }
    .with_env()
    .context("Invalid environment override")?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    config.validate().context("Invalid configuration")?;
    tracing::debug!(?config, "Loaded configuration");

    let http_client = reqwest::Client::builder()
        .redirect(create_redirect_policy())
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .timeout(config.fetch_timeout().max(config.dispatch_timeout()))
        .build()
        .context("Failed to build HTTP client")?;

    let target = NotifyTarget::from_parts(
        config.notification_sender.as_deref(),
        config.notification_endpoint.as_deref(),
    );
    if target.is_none() {
        tracing::warn!("NOTIFICATION_SENDER or NOTIFICATION_ENDPOINT not set, new items will not be pushed");
    }

    let parser = Arc::new(HttpFeedParser::new(http_client.clone(), config.fetch_timeout()));
    let cycle = Arc::new(PollCycle::new(
        parser,
        Dispatcher::new(http_client.clone(), config.dispatch_timeout()),
        target,
        FeedCache::new(),
    ));
    let scheduler = Arc::new(Scheduler::new(cycle));

    if !config.feeds.is_empty() {
        scheduler
            .restart_with(
                config.poll_interval(),
                scheduler.cycle().set_sources(config.feeds.clone()),
            )
            .await?;
    }

    let cors_origin = config
        .cors_origin
        .as_deref()
        .map(HeaderValue::from_str)
        .transpose()
        .context("Invalid CORS origin")?;

    let state = AppState {
        scheduler: Arc::clone(&scheduler),
        relay: DiscordRelay::new(http_client, config.dispatch_timeout()),
        default_interval: config.poll_interval(),
    };
    let app = create_router(state, cors_origin);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if scheduler.stop().await {
        tracing::info!("Poller stopped");
    }
    Ok(())
}
