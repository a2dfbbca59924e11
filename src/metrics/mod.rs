//! Byte counting, periodic rate sampling, and the optional CSV sample log.
mod collector;
mod logging;
mod types;

#[cfg(test)]
mod tests;

pub use collector::{Collector, CollectorSettings};
pub use types::{RatePoint, Stats, bytes_to_megabytes, mb_per_min_to_mb_per_sec, rate_mb_per_min};
