use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::parse::parse_duration_value;

/// On-disk configuration. Every field is optional; values given on the
/// command line take precedence.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_sources: Option<Vec<String>>,
    /// MB/min; `<= 0` disables throttling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_rate: Option<i64>,
    /// Bare numbers are minutes; `0` means run until interrupted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<DurationValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose_logging: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_metrics: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_file: Option<String>,
    /// Worker count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency_factor: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_randomization: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<DurationValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<DurationValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_backoff: Option<DurationValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_interval: Option<DurationValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_log: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_interval: Option<DurationValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_color: Option<bool>,
}

/// A duration written either as a bare number or as a string with a unit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DurationValue {
    Number(u64),
    Text(String),
}

impl DurationValue {
    /// Resolves the value, reading a bare number in units of `unit`.
    pub(crate) fn to_duration(&self, unit: Duration) -> Result<Duration, ConfigError> {
        match self {
            DurationValue::Number(count) => {
                let count = u32::try_from(*count).map_err(|_overflow| ConfigError::DurationOverflow)?;
                let duration = unit.checked_mul(count).ok_or(ConfigError::DurationOverflow)?;
                if duration.is_zero() {
                    return Err(ConfigError::DurationZero);
                }
                Ok(duration)
            }
            DurationValue::Text(text) => parse_duration_value(text),
        }
    }

    pub(crate) const fn is_zero_number(&self) -> bool {
        matches!(self, DurationValue::Number(0))
    }
}
