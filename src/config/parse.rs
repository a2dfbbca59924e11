use std::time::Duration;

use crate::error::ConfigError;

/// Parses `<number><unit>` with unit `ms`, `s`, `m` or `h`; a bare number is
/// seconds.
pub(crate) fn parse_duration_value(value: &str) -> Result<Duration, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::DurationEmpty);
    }

    let digits_len = value.chars().take_while(char::is_ascii_digit).count();
    if digits_len == 0 {
        return Err(ConfigError::InvalidDurationFormat {
            value: value.to_owned(),
        });
    }
    let (num_part, unit_part) = value.split_at(digits_len);
    let number: u64 = num_part
        .parse()
        .map_err(|err| ConfigError::InvalidDurationNumber {
            value: value.to_owned(),
            source: err,
        })?;

    let unit = if unit_part.is_empty() { "s" } else { unit_part };
    let duration = match unit {
        "ms" => Duration::from_millis(number),
        "s" => Duration::from_secs(number),
        "m" => Duration::from_secs(
            number
                .checked_mul(60)
                .ok_or(ConfigError::DurationOverflow)?,
        ),
        "h" => Duration::from_secs(
            number
                .checked_mul(3600)
                .ok_or(ConfigError::DurationOverflow)?,
        ),
        _ => {
            return Err(ConfigError::InvalidDurationUnit {
                unit: unit.to_owned(),
            });
        }
    };

    if duration.is_zero() {
        return Err(ConfigError::DurationZero);
    }

    Ok(duration)
}

/// Renders a duration in the largest unit that represents it exactly, so it
/// parses back to the same value.
pub(crate) fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis == 0 || duration.subsec_millis() != 0 {
        return format!("{}ms", millis);
    }
    let secs = duration.as_secs();
    if secs.checked_rem(3600) == Some(0) {
        return format!("{}h", secs / 3600);
    }
    if secs.checked_rem(60) == Some(0) {
        return format!("{}m", secs / 60);
    }
    format!("{}s", secs)
}
