use clap::ArgMatches;
use clap::parser::ValueSource;
use std::time::Duration;

use crate::args::PositiveUsize;
use crate::error::{AppError, AppResult, ConfigError};

use super::super::types::DurationValue;

pub(super) fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

pub(super) fn ensure_positive_usize(value: usize, field: &str) -> AppResult<PositiveUsize> {
    PositiveUsize::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
            source: err,
        })
    })
}

/// Bare numbers in the config file count seconds unless stated otherwise.
pub(super) fn seconds(value: &DurationValue) -> AppResult<Duration> {
    value
        .to_duration(Duration::from_secs(1))
        .map_err(AppError::config)
}
