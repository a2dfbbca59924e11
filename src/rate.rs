//! Aggregate throughput throttling shared by all fetch workers.
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;


const BYTES_PER_MB: u64 = 1024 * 1024;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Length of one accounting window.
pub const WINDOW: Duration = Duration::from_secs(1);
/// Upper bound on any single pause handed back to a worker.
pub const MAX_WAIT: Duration = Duration::from_millis(500);

struct Window {
    start: Instant,
    bytes: u64,
}

/// Sliding one-second byte budget.
///
/// Every worker reports the size of each chunk it reads and sleeps for the
/// returned duration. The decision is best-effort: the window restarts
/// whenever more than a second has passed since it opened, and any single
/// wait is clamped to [`MAX_WAIT`] so cancellation stays responsive.
pub struct RateLimiter {
    target_bytes_per_sec: Option<u64>,
    window: Mutex<Window>,
}

impl RateLimiter {
    /// Builds a limiter for a target expressed in MB/min.
    /// A target `<= 0` disables throttling.
    #[must_use]
    pub fn new(target_mb_per_min: i64) -> Self {
        let target_bytes_per_sec = u64::try_from(target_mb_per_min)
            .ok()
            .filter(|mb| *mb > 0)
            .map(|mb| {
                mb.saturating_mul(BYTES_PER_MB)
                    .checked_div(60)
                    .unwrap_or(0)
                    .max(1)
            });
        Self {
            target_bytes_per_sec,
            window: Mutex::new(Window {
                start: Instant::now(),
                bytes: 0,
            }),
        }
    }

    #[must_use]
    pub const fn target_bytes_per_sec(&self) -> Option<u64> {
        self.target_bytes_per_sec
    }

    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.target_bytes_per_sec.is_none()
    }

    /// Accounts `bytes` against the current window and returns how long the
    /// caller should pause.
    pub fn decide(&self, bytes: u64) -> Duration {
        self.decide_at(Instant::now(), bytes)
    }

    /// Same as [`RateLimiter::decide`] with an explicit clock reading.
    pub fn decide_at(&self, now: Instant, bytes: u64) -> Duration {
        let Some(target) = self.target_bytes_per_sec else {
            return Duration::ZERO;
        };

        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        let elapsed = now.saturating_duration_since(window.start);
        if elapsed > WINDOW {
            window.start = now;
            window.bytes = 0;
            return Duration::ZERO;
        }

        window.bytes = window.bytes.saturating_add(bytes);
        let target = u128::from(target);
        let allowed = target
            .saturating_mul(elapsed.as_nanos())
            .checked_div(NANOS_PER_SEC)
            .unwrap_or(0);
        let consumed = u128::from(window.bytes);
        if consumed <= allowed {
            return Duration::ZERO;
        }

        let wait_nanos = consumed
            .saturating_sub(allowed)
            .saturating_mul(NANOS_PER_SEC)
            .checked_div(target)
            .unwrap_or(0);
        let wait_nanos = u64::try_from(wait_nanos).unwrap_or(u64::MAX);
        Duration::from_nanos(wait_nanos).min(MAX_WAIT)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("target_bytes_per_sec", &self.target_bytes_per_sec)
            .finish_non_exhaustive()
    }
}
