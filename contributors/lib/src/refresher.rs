//! Periodic background refresh of a [`ReleaseCache`].

use crate::cache::ReleaseCache;
use crate::source::DocumentSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

/// Spawns the refresh loop.
pub struct Refresher;

/// Handle to a running refresh loop. Dropping it leaves the loop running.
#[derive(Debug)]
pub struct RefresherHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Refresher {
    /// Spawns a task that refreshes `cache` immediately and then once per
    /// `refresh_interval` from the cache's configuration.
    ///
    /// Must be called from within a Tokio runtime. A refresh already in
    /// progress when shutdown is requested runs to completion first.
    ///
    /// ## Examples
    ///
    /// ```rust,no_run
    /// use contributors_lib::{GitHubSource, Refresher, ReleaseCache, ScraperConfig};
    /// use std::sync::Arc;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = ScraperConfig::default();
    /// let cache = Arc::new(ReleaseCache::new(GitHubSource::new(config.clone())?, config));
    ///
    /// let handle = Refresher::spawn(Arc::clone(&cache));
    /// // ... serve requests from `cache` ...
    /// handle.shutdown().await;
    /// # Ok(())
    /// # }
    /// ```
    pub fn spawn<S>(cache: Arc<ReleaseCache<S>>) -> RefresherHandle
    where
        S: DocumentSource + 'static,
    {
        let (stop, stopped) = watch::channel(false);
        let period = cache.config().refresh_interval;
        let task = tokio::spawn(run(cache, period, stopped));
        RefresherHandle { stop, task }
    }
}

async fn run<S>(cache: Arc<ReleaseCache<S>>, period: Duration, mut stopped: watch::Receiver<bool>)
where
    S: DocumentSource + 'static,
{
    // interval panics on a zero period
    let mut ticker = time::interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval_secs = period.as_secs(), "Release refresher started");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let releases = cache.refresh().await;
                debug!(releases = releases.len(), "Scheduled refresh complete");
            }
            changed = stopped.changed() => {
                // A dropped sender also ends the loop
                if changed.is_err() || *stopped.borrow() {
                    break;
                }
            }
        }
    }
    info!("Release refresher stopped");
}

impl RefresherHandle {
    /// Signals the loop to stop and waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
