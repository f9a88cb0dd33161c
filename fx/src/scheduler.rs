//! Periodic and manual rate refresh.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::error::FxResult;
use crate::fetcher::RateFetcher;
use crate::notice::{Notice, Notifier};
use crate::store::SharedRateStore;

/// Keeps the rate store fresh.
///
/// Every refresh is a full fetch followed by a wholesale store replacement.
/// Scheduled and manual refreshes may overlap; the one that completes last
/// determines the store contents.
pub struct RefreshScheduler {
    fetcher: Arc<dyn RateFetcher>,
    store: SharedRateStore,
    notifier: Notifier,
    interval: Duration,
    in_flight: AtomicUsize,
}

impl RefreshScheduler {
    /// Create a new scheduler. A zero interval is raised to one millisecond.
    pub fn new(
        fetcher: Arc<dyn RateFetcher>,
        store: SharedRateStore,
        notifier: Notifier,
        interval: Duration,
    ) -> Self {
        Self {
            fetcher,
            store,
            notifier,
            interval: interval.max(Duration::from_millis(1)),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check if any refresh is in flight.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Fetch and replace. Returns the number of rates installed.
    ///
    /// On failure the previous snapshot is kept and a stale-rates notice is
    /// published; the error is returned for callers that care.
    #[instrument(skip(self), fields(fetcher = %self.fetcher.name()))]
    pub async fn refresh(&self) -> FxResult<usize> {
        let _loading = LoadingGuard::enter(&self.in_flight);

        match self.fetch_and_replace().await {
            Ok(count) => Ok(count),
            Err(err) => {
                warn!(
                    error = %err,
                    retryable = err.is_retryable(),
                    "Rate refresh failed, keeping previous rates"
                );
                self.notifier.publish(Notice::rates_stale(&err));
                Err(err)
            }
        }
    }

    /// User-triggered refresh. Publishes an "updated" notice on success.
    pub async fn refresh_now(&self) -> FxResult<usize> {
        let count = self.refresh().await?;
        self.notifier.publish(Notice::rates_updated(count));
        Ok(count)
    }

    async fn fetch_and_replace(&self) -> FxResult<usize> {
        let rates = self.fetcher.fetch_all().await?;
        let count = rates.len();
        let generation = self.store.replace_all(rates)?;
        info!(count, generation, "Exchange rates refreshed");
        Ok(count)
    }

    /// Run the initial refresh, then arm the interval timer.
    ///
    /// The first scheduled tick fires one interval after this call returns.
    pub async fn start(self: Arc<Self>) -> RefreshHandle {
        // A failed initial load is already logged and notified
        let _ = self.refresh().await;

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let period = self.interval;
        let first_tick = Instant::now() + period;

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        debug!("Refresh timer cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        let _ = self.refresh().await;
                    }
                }
            }
        });

        info!(interval_secs = period.as_secs(), "Refresh timer armed");
        RefreshHandle { shutdown_tx, task }
    }
}

/// Handle to the running refresh timer.
///
/// Dropping the handle closes the shutdown channel, which also stops the
/// timer at its next wake-up.
pub struct RefreshHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Cancel the timer and wait for the loop to exit.
    ///
    /// A refresh already in flight completes and may still write the store.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "Refresh task ended abnormally");
        }
    }

    /// Check if the timer loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
