use std::collections::VecDeque;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;

use super::super::logging::LogSink;
use super::super::types::{RatePoint, Stats, bytes_to_megabytes, rate_mb_per_min};

/// Everything the sampler owns; guarded by one mutex in the collector.
pub(super) struct SamplerState {
    pub(super) started: Instant,
    pub(super) started_at: DateTime<Utc>,
    pub(super) stopped: Option<Instant>,
    pub(super) last_sample_time: Instant,
    pub(super) last_sample_bytes: u64,
    pub(super) peak_rate: f64,
    pub(super) history: VecDeque<RatePoint>,
    pub(super) history_limit: usize,
    pub(super) log: Option<LogSink>,
}

impl SamplerState {
    pub(super) fn new(history_limit: usize) -> Self {
        let now = Instant::now();
        let history_limit = history_limit.max(1);
        Self {
            started: now,
            started_at: Utc::now(),
            stopped: None,
            last_sample_time: now,
            last_sample_bytes: 0,
            peak_rate: 0.0,
            history: VecDeque::with_capacity(history_limit),
            history_limit,
            log: None,
        }
    }

    /// Restarts the clock and clears every figure. An attached log survives.
    pub(super) fn reset(&mut self, now: Instant, wall: DateTime<Utc>) {
        self.started = now;
        self.started_at = wall;
        self.stopped = None;
        self.last_sample_time = now;
        self.last_sample_bytes = 0;
        self.peak_rate = 0.0;
        self.history.clear();
    }

    /// Maps a monotonic reading onto the wall clock captured at start.
    pub(super) fn wall_clock_at(&self, now: Instant) -> DateTime<Utc> {
        TimeDelta::from_std(now.saturating_duration_since(self.started))
            .ok()
            .and_then(|delta| self.started_at.checked_add_signed(delta))
            .unwrap_or(self.started_at)
    }

    /// Turns the bytes moved since the previous tick into a history entry.
    /// Returns `None` when no time has passed.
    pub(super) fn record_sample(&mut self, now: Instant, total_bytes: u64) -> Option<RatePoint> {
        let span = now.saturating_duration_since(self.last_sample_time);
        if span.is_zero() {
            return None;
        }
        let delta = total_bytes.saturating_sub(self.last_sample_bytes);
        let point = RatePoint {
            timestamp: self.wall_clock_at(now),
            rate: rate_mb_per_min(delta, span),
        };

        while self.history.len() >= self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(point);
        if point.rate > self.peak_rate {
            self.peak_rate = point.rate;
        }
        self.last_sample_time = now;
        self.last_sample_bytes = total_bytes;
        Some(point)
    }

    pub(super) fn snapshot(&self, now: Instant, total_bytes: u64) -> Stats {
        let now = self.stopped.map_or(now, |stopped| stopped.min(now));
        let elapsed = now.saturating_duration_since(self.started);
        let total_megabytes = bytes_to_megabytes(total_bytes);
        let elapsed_minutes = elapsed.as_secs_f64() / 60.0;
        let average_rate = if elapsed.is_zero() {
            0.0
        } else {
            total_megabytes / elapsed_minutes
        };
        // Before the first tick, fall back to the whole-run figure.
        let current_rate = self
            .history
            .back()
            .map_or_else(|| rate_mb_per_min(total_bytes, elapsed), |point| point.rate);

        Stats {
            bytes_transferred: total_bytes,
            elapsed,
            started_at: self.started_at,
            current_rate,
            peak_rate: self.peak_rate,
            average_rate,
            total_megabytes,
            rate_history: self.history.iter().copied().collect(),
            last_updated: self.wall_clock_at(now),
        }
    }
}
