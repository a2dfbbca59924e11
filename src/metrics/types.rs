use std::time::Duration;

use chrono::{DateTime, Utc};

pub(crate) const BYTES_PER_MB: f64 = 1_048_576.0;
const MB_PER_GB: f64 = 1024.0;
const SECONDS_PER_MINUTE: f64 = 60.0;

/// One sampled throughput value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatePoint {
    pub timestamp: DateTime<Utc>,
    /// MB/min over the sampling interval ending at `timestamp`.
    pub rate: f64,
}

/// Point-in-time copy of the collector's figures. Rates are MB/min.
#[derive(Debug, Clone)]
pub struct Stats {
    pub bytes_transferred: u64,
    pub elapsed: Duration,
    pub started_at: DateTime<Utc>,
    pub current_rate: f64,
    pub peak_rate: f64,
    pub average_rate: f64,
    pub total_megabytes: f64,
    pub rate_history: Vec<RatePoint>,
    pub last_updated: DateTime<Utc>,
}

impl Stats {
    #[must_use]
    pub fn total_gigabytes(&self) -> f64 {
        self.total_megabytes / MB_PER_GB
    }
}

#[must_use]
pub fn bytes_to_megabytes(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// MB/min for `bytes` moved over `span`; zero for an empty span.
#[must_use]
pub fn rate_mb_per_min(bytes: u64, span: Duration) -> f64 {
    if span.is_zero() {
        return 0.0;
    }
    bytes_to_megabytes(bytes) / span.as_secs_f64() * SECONDS_PER_MINUTE
}

/// Converts MB/min to the MB/s figure used in the CSV log.
#[must_use]
pub fn mb_per_min_to_mb_per_sec(rate: f64) -> f64 {
    rate / SECONDS_PER_MINUTE
}
