use clap::Parser;
use std::time::Duration;

use super::defaults::{DEFAULT_METRICS_FILE, DEFAULT_TARGET_RATE};
use super::parsers::{parse_bool_env, parse_duration_arg, parse_positive_usize};
use super::types::PositiveUsize;

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Sustained download traffic generator: pulls large files from HTTP mirrors at a throttled aggregate rate, discards the bytes, and reports throughput."
)]
pub struct SinkholeArgs {
    /// Source URL to download from (repeatable; defaults to a built-in mirror list)
    #[arg(long = "source", short = 'u')]
    pub sources: Vec<String>,

    /// Target aggregate throughput in MB/min (0 or negative disables throttling)
    #[arg(
        long = "rate",
        short = 'r',
        default_value_t = DEFAULT_TARGET_RATE,
        allow_negative_numbers = true
    )]
    pub target_rate: i64,

    /// Stop after this long (supports ms/s/m/h); runs until interrupted when omitted
    #[arg(long = "duration", short = 't', value_parser = parse_duration_arg)]
    pub duration: Option<Duration>,

    /// Number of concurrent fetch workers (derived from CPU count and target rate when omitted)
    #[arg(long = "workers", short = 'w', value_parser = parse_positive_usize)]
    pub workers: Option<PositiveUsize>,

    /// Do not append a cache-busting query parameter to source URLs
    #[arg(long = "no-randomize")]
    pub no_randomize: bool,

    /// Bound on waiting for response headers and on each body read (supports ms/s/m/h)
    #[arg(long = "timeout", default_value = "60s", value_parser = parse_duration_arg)]
    pub request_timeout: Duration,

    /// Bound on establishing a connection (supports ms/s/m/h)
    #[arg(long = "connect-timeout", default_value = "5s", value_parser = parse_duration_arg)]
    pub connect_timeout: Duration,

    /// Attempts per source before rotating to the next one
    #[arg(long = "retries", default_value = "3", value_parser = parse_positive_usize)]
    pub max_attempts: PositiveUsize,

    /// Pause after a failed attempt (supports ms/s/m/h)
    #[arg(long = "retry-backoff", default_value = "500ms", value_parser = parse_duration_arg)]
    pub retry_backoff: Duration,

    /// Path of the JSON stats snapshot
    #[arg(long = "metrics", default_value = DEFAULT_METRICS_FILE)]
    pub metrics_file: String,

    /// How often the stats snapshot is rewritten (supports ms/s/m/h)
    #[arg(long = "save-interval", default_value = "60s", value_parser = parse_duration_arg)]
    pub save_interval: Duration,

    /// Do not write the JSON stats snapshot
    #[arg(long = "no-save-metrics")]
    pub no_save_metrics: bool,

    /// Append one CSV row per rate sample to this file (defaults to a timestamped name when saving metrics)
    #[arg(long = "metrics-log")]
    pub metrics_log: Option<String>,

    /// How often the progress line is printed (supports ms/s/m/h)
    #[arg(long = "progress-interval", default_value = "10s", value_parser = parse_duration_arg)]
    pub progress_interval: Duration,

    /// Disable color output
    #[arg(long = "no-color", env = "NO_COLOR", value_parser = parse_bool_env)]
    pub no_color: bool,

    /// Skip the startup banner
    #[arg(long = "no-banner")]
    pub no_banner: bool,

    /// Enable verbose logging (per-attempt failures; sets log level to debug unless overridden by SINKHOLE_LOG/RUST_LOG)
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Path to config file (TOML/JSON). Defaults to ./sinkhole.toml or ./sinkhole.json if present.
    #[arg(long)]
    pub config: Option<String>,

    /// Write the effective settings to this path (TOML/JSON) and exit
    #[arg(long = "save-config")]
    pub save_config: Option<String>,
}

impl SinkholeArgs {
    /// Sources to fetch, falling back to the built-in mirror list.
    #[must_use]
    pub fn effective_sources(&self) -> Vec<String> {
        if self.sources.is_empty() {
            super::default_sources()
        } else {
            self.sources.clone()
        }
    }

    /// Metrics log path; only defaulted when snapshots are enabled.
    #[must_use]
    pub fn effective_metrics_log(&self, started_at: &chrono::DateTime<chrono::Local>) -> Option<String> {
        if let Some(path) = self.metrics_log.as_ref() {
            return Some(path.clone());
        }
        if self.no_save_metrics {
            return None;
        }
        Some(super::default_metrics_log_path(started_at))
    }
}
