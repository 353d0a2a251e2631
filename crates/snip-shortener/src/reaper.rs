use snip_core::repository::Result;
use snip_core::{Clock, Repository, SystemClock};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Periodically removes expired records from the store.
///
/// Resolution already reaps an expired record when it is requested; the
/// reaper catches the ones nobody asks for again. Cache entries are left to
/// expire through their own TTL.
pub struct Reaper<R> {
    repository: Arc<R>,
    interval: Duration,
    clock: Arc<dyn Clock>,
}

impl<R: Repository> Reaper<R> {
    pub fn new(repository: Arc<R>, interval: Duration) -> Self {
        Self {
            repository,
            interval: interval.max(Duration::from_millis(1)),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Performs a single sweep and returns the number of records removed.
    pub async fn run_once(&self) -> Result<u64> {
        self.repository.delete_expired(self.clock.now()).await
    }

    /// Sweeps every `interval` until `shutdown` completes.
    ///
    /// The first sweep happens immediately. A failed sweep is logged and
    /// retried on the next tick.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(interval = ?self.interval, "Expired-record reaper started");

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => match self.run_once().await {
                    Ok(0) => debug!("No expired records to reap"),
                    Ok(removed) => info!(removed, "Reaped expired records"),
                    Err(e) => warn!(error = %e, "Failed to reap expired records"),
                },
            }
        }

        info!("Expired-record reaper stopped");
    }
}
