use std::time::Duration;

use url::Url;

use crate::args::{PositiveUsize, SinkholeArgs, available_cores, default_worker_count};
use crate::error::{AppError, AppResult, ValidationError};

use super::state::RetryPolicy;

const BASE_BUFFER_SIZE: usize = 128 * 1024;
const BUFFER_SIZE_STEP: usize = 32 * 1024;
const BUFFER_SIZE_VARIANTS: usize = 8;

/// Everything the pool needs to know about a run.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Ordered fetch targets; must not be empty.
    pub sources: Vec<String>,
    /// Aggregate ceiling in MB/min; `<= 0` means unthrottled.
    pub target_rate_mb_per_min: i64,
    /// Explicit worker count; derived from cores and target when `None`.
    pub workers: Option<PositiveUsize>,
    /// Append a unique `t=` query parameter to every request.
    pub randomize: bool,
    /// Bound on waiting for response headers and on each body read.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub max_attempts: PositiveUsize,
    pub retry_backoff: Duration,
    /// Log each failed attempt.
    pub verbose: bool,
}

impl FetchConfig {
    /// Defaults for everything but the source list.
    #[must_use]
    pub fn new(sources: Vec<String>) -> Self {
        Self {
            sources,
            target_rate_mb_per_min: crate::args::DEFAULT_TARGET_RATE,
            workers: None,
            randomize: true,
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(5),
            max_attempts: PositiveUsize::try_from(3).unwrap_or(PositiveUsize::MIN),
            retry_backoff: Duration::from_millis(500),
            verbose: false,
        }
    }

    #[must_use]
    pub fn from_args(args: &SinkholeArgs) -> Self {
        Self {
            sources: args.effective_sources(),
            target_rate_mb_per_min: args.target_rate,
            workers: args.workers,
            randomize: !args.no_randomize,
            request_timeout: args.request_timeout,
            connect_timeout: args.connect_timeout,
            max_attempts: args.max_attempts,
            retry_backoff: args.retry_backoff,
            verbose: args.verbose,
        }
    }

    /// Explicit count if configured, otherwise derived from the host and target.
    #[must_use]
    pub fn resolve_worker_count(&self) -> usize {
        self.workers.map_or_else(
            || default_worker_count(self.target_rate_mb_per_min, available_cores()),
            PositiveUsize::get,
        )
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.get(),
            backoff: self.retry_backoff,
        }
    }

    /// Parses every source, rejecting the list as a whole on the first bad one.
    ///
    /// # Errors
    ///
    /// Returns an error when the list is empty, a source is not a valid URL,
    /// or a source uses a scheme other than http/https.
    pub fn parse_sources(&self) -> AppResult<Vec<Url>> {
        if self.sources.is_empty() {
            return Err(AppError::validation(ValidationError::MissingSources));
        }
        self.sources
            .iter()
            .map(|source| parse_source(source))
            .collect()
    }
}

fn parse_source(source: &str) -> AppResult<Url> {
    let url = Url::parse(source.trim()).map_err(|err| {
        AppError::validation(ValidationError::InvalidSourceUrl {
            url: source.to_owned(),
            source: err,
        })
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(AppError::validation(
            ValidationError::UnsupportedSourceScheme {
                url: source.to_owned(),
            },
        )),
    }
}

/// Read buffer size for a worker. Neighbouring workers get different sizes so
/// their reads do not fall into lockstep.
#[must_use]
pub fn buffer_size_for_worker(worker_id: usize) -> usize {
    let variant = worker_id.checked_rem(BUFFER_SIZE_VARIANTS).unwrap_or(0);
    BASE_BUFFER_SIZE.saturating_add(BUFFER_SIZE_STEP.saturating_mul(variant))
}
