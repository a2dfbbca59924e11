mod state;

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::error::MetricsError;
use crate::shutdown::{ShutdownSender, shutdown_channel};

use super::logging::{LogSink, format_record};
use super::types::{RatePoint, Stats};
use state::SamplerState;

const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_HISTORY_LIMIT: usize = 60;

#[derive(Debug, Clone, Copy)]
pub struct CollectorSettings {
    /// Time between rate samples.
    pub sample_interval: Duration,
    /// Number of samples kept; the oldest is evicted first.
    pub history_limit: usize,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

struct Shared {
    settings: CollectorSettings,
    total_bytes: AtomicU64,
    running: AtomicBool,
    sampler: Mutex<SamplerState>,
    task: Mutex<Option<JoinHandle<()>>>,
    stop_tx: ShutdownSender,
}

impl Shared {
    fn lock_sampler(&self) -> MutexGuard<'_, SamplerState> {
        self.sampler.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sample(&self, now: Instant) -> Option<RatePoint> {
        let (point, row) = {
            let mut sampler = self.lock_sampler();
            if !self.running.load(Ordering::Acquire) {
                return None;
            }
            let total = self.total_bytes.load(Ordering::Acquire);
            let point = sampler.record_sample(now, total)?;
            let row = sampler.log.as_ref().map(|log| {
                (
                    log.sender(),
                    format_record(point.timestamp, total, point.rate),
                )
            });
            (point, row)
        };

        if let Some((rows, record)) = row
            && rows.send(record).is_err()
        {
            // The writer already reported why it quit.
            let mut sampler = self.lock_sampler();
            if sampler.log.as_ref().is_some_and(|log| log.sender().same_channel(&rows)) {
                sampler.log = None;
            }
        }
        Some(point)
    }
}

/// Thread-safe byte counter with a background rate sampler.
///
/// Cloning is cheap and every clone observes the same counters. Workers call
/// [`Collector::add_bytes`] on the hot path; it is a single atomic add and
/// never contends with the sampler.
#[derive(Clone)]
pub struct Collector {
    inner: Arc<Shared>,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector {
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(CollectorSettings::default())
    }

    #[must_use]
    pub fn with_settings(settings: CollectorSettings) -> Self {
        let (stop_tx, _) = shutdown_channel();
        Self {
            inner: Arc::new(Shared {
                settings,
                total_bytes: AtomicU64::new(0),
                running: AtomicBool::new(false),
                sampler: Mutex::new(SamplerState::new(settings.history_limit)),
                task: Mutex::new(None),
                stop_tx,
            }),
        }
    }

    #[must_use]
    pub fn settings(&self) -> CollectorSettings {
        self.inner.settings
    }

    /// Resets every figure and launches the sampler. No-op while running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        {
            let mut sampler = self.inner.lock_sampler();
            if self.inner.running.load(Ordering::Acquire) {
                return;
            }
            sampler.reset(Instant::now(), Utc::now());
            self.inner.total_bytes.store(0, Ordering::Release);
            self.inner.running.store(true, Ordering::Release);
        }

        let handle = spawn_sampler(Arc::downgrade(&self.inner), &self.inner);
        let mut task = self.inner.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(stale) = task.replace(handle) {
            stale.abort();
        }
        debug!(
            "Metrics sampler started (interval {:?}, history {}).",
            self.inner.settings.sample_interval, self.inner.settings.history_limit
        );
    }

    pub fn add_bytes(&self, bytes: u64) {
        self.inner.total_bytes.fetch_add(bytes, Ordering::AcqRel);
    }

    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.inner.total_bytes.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Consistent snapshot; valid before start and after stop.
    #[must_use]
    pub fn stats(&self) -> Stats {
        let sampler = self.inner.lock_sampler();
        sampler.snapshot(Instant::now(), self.total_bytes())
    }

    /// Stops sampling, freezes the elapsed clock, and closes the log file.
    ///
    /// Returns once every sampled row has been written out.
    pub async fn stop(&self) {
        let log = {
            let mut sampler = self.inner.lock_sampler();
            if self.inner.running.swap(false, Ordering::AcqRel) {
                sampler.stopped = Some(Instant::now());
            }
            sampler.log.take()
        };
        drop(self.inner.stop_tx.send(()));

        if let Some(log) = log {
            close_log(log).await;
        }
    }

    /// Starts appending one CSV row per sample to `path`, replacing any
    /// previously attached file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be created. Counting and
    /// sampling are unaffected.
    pub async fn attach_log_file(&self, path: &Path) -> Result<(), MetricsError> {
        let log = LogSink::create(path).await?;
        let previous = self.inner.lock_sampler().log.replace(log);
        if let Some(previous) = previous {
            close_log(previous).await;
        }
        Ok(())
    }

    /// Takes one sample as if the sampler had ticked at `now`.
    #[cfg(test)]
    pub(crate) fn sample_at(&self, now: Instant) -> Option<RatePoint> {
        self.inner.sample(now)
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("settings", &self.inner.settings)
            .field("total_bytes", &self.total_bytes())
            .field("running", &self.is_running())
            .finish()
    }
}

async fn close_log(log: LogSink) {
    let path = log.path().to_path_buf();
    if let Err(err) = log.finish().await {
        warn!("Failed to close metrics log '{}': {}", path.display(), err);
    }
}

fn spawn_sampler(shared: Weak<Shared>, owner: &Shared) -> JoinHandle<()> {
    let period = owner.settings.sample_interval.max(Duration::from_millis(1));
    let mut stop_rx = owner.stop_tx.subscribe();

    tokio::spawn(async move {
        let first_tick = Instant::now()
            .checked_add(period)
            .unwrap_or_else(Instant::now);
        let mut ticker = tokio::time::interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = stop_rx.recv() => break,
                _ = ticker.tick() => {
                    let Some(shared) = shared.upgrade() else {
                        break;
                    };
                    if !shared.running.load(Ordering::Acquire) {
                        break;
                    }
                    shared.sample(Instant::now());
                }
            }
        }
    })
}
