use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Work run on every tick. Failures are handled (logged) inside.
#[async_trait]
pub trait Cycle: Send + Sync + 'static {
    async fn run_cycle(&self);
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Poll interval must be greater than zero")]
    InvalidInterval,
}

/// Handle to the running loop.
struct PollLoop {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
    interval: Duration,
}

impl PollLoop {
    /// Signals the loop and waits for it to exit, including any cycle it is
    /// in the middle of.
    async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Poll loop terminated abnormally");
        }
    }
}

/// Drives a [`Cycle`] on a repeating timer, with at most one loop alive.
pub struct Scheduler<C: Cycle> {
    cycle: Arc<C>,
    active: Mutex<Option<PollLoop>>,
}

impl<C: Cycle> Scheduler<C> {
    pub fn new(cycle: Arc<C>) -> Self {
        Self {
            cycle,
            active: Mutex::new(None),
        }
    }

    pub fn cycle(&self) -> &Arc<C> {
        &self.cycle
    }

    /// Starts polling every `interval`, the first cycle one interval from now.
    ///
    /// A loop that is already running is stopped first, and this waits for it
    /// to exit, so cycles of the old and new loop never overlap.
    pub async fn start(&self, interval: Duration) -> Result<(), SchedulerError> {
        self.restart_with(interval, async {}).await
    }

    /// Like [`start`](Self::start), but runs `apply` after the previous loop
    /// has exited and before the new one is spawned.
    ///
    /// The loop slot stays locked throughout, so concurrent restarts and
    /// stops are serialized and no cycle observes a half-applied change.
    pub async fn restart_with<F>(&self, interval: Duration, apply: F) -> Result<(), SchedulerError>
    where
        F: Future<Output = ()>,
    {
        if interval.is_zero() {
            return Err(SchedulerError::InvalidInterval);
        }

        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            tracing::info!("Stopping previous poller before restart");
            previous.stop().await;
        }

        apply.await;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(poll_loop(Arc::clone(&self.cycle), interval, shutdown_rx));
        *active = Some(PollLoop {
            shutdown,
            handle,
            interval,
        });

        tracing::info!(interval_secs = interval.as_secs_f64(), "Started long poller");
        Ok(())
    }

    /// Stops the loop after its in-flight cycle, if any. Returns whether a
    /// loop was running.
    ///
    /// Holds the loop slot until the old loop has exited.
    pub async fn stop(&self) -> bool {
        let mut active = self.active.lock().await;
        match active.take() {
            Some(poll_loop) => {
                poll_loop.stop().await;
                true
            }
            None => false,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// Interval of the running loop.
    pub async fn interval(&self) -> Option<Duration> {
        self.active.lock().await.as_ref().map(|l| l.interval)
    }
}

async fn poll_loop<C: Cycle>(cycle: Arc<C>, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            // Also fires if the sender is dropped
            _ = shutdown.changed() => break,

            _ = ticker.tick() => cycle.run_cycle().await,
        }
    }

    tracing::info!("Stopped polling");
}
