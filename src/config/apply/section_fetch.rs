use clap::ArgMatches;
use std::time::Duration;

use crate::args::SinkholeArgs;
use crate::error::{AppError, AppResult, ConfigError};

use super::super::types::ConfigFile;
use super::util::{ensure_positive_usize, is_cli, seconds};

pub(super) fn apply_fetch_config(
    args: &mut SinkholeArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_cli(matches, "sources")
        && let Some(sources) = config.data_sources.as_ref()
    {
        if sources.is_empty() {
            return Err(AppError::config(ConfigError::EmptySources));
        }
        args.sources = sources.clone();
    }

    if !is_cli(matches, "target_rate")
        && let Some(rate) = config.target_rate
    {
        args.target_rate = rate;
    }

    if !is_cli(matches, "duration")
        && let Some(duration) = config.duration.as_ref()
    {
        args.duration = if duration.is_zero_number() {
            None
        } else {
            Some(
                duration
                    .to_duration(Duration::from_secs(60))
                    .map_err(AppError::config)?,
            )
        };
    }

    if !is_cli(matches, "workers")
        && let Some(workers) = config.concurrency_factor
    {
        args.workers = Some(ensure_positive_usize(workers, "concurrency_factor")?);
    }

    if !is_cli(matches, "no_randomize")
        && let Some(randomize) = config.use_randomization
    {
        args.no_randomize = !randomize;
    }

    if !is_cli(matches, "request_timeout")
        && let Some(timeout) = config.request_timeout.as_ref()
    {
        args.request_timeout = seconds(timeout)?;
    }

    if !is_cli(matches, "connect_timeout")
        && let Some(timeout) = config.connect_timeout.as_ref()
    {
        args.connect_timeout = seconds(timeout)?;
    }

    if !is_cli(matches, "max_attempts")
        && let Some(attempts) = config.max_attempts
    {
        args.max_attempts = ensure_positive_usize(attempts, "max_attempts")?;
    }

    if !is_cli(matches, "retry_backoff")
        && let Some(backoff) = config.retry_backoff.as_ref()
    {
        args.retry_backoff = seconds(backoff)?;
    }

    Ok(())
}
