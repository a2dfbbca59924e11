use std::path::Path;

use crate::args::SinkholeArgs;
use crate::error::{AppError, AppResult, ConfigError};

use super::parse::format_duration;
use super::types::{ConfigFile, DurationValue};

impl ConfigFile {
    /// Captures the resolved settings in config-file form.
    #[must_use]
    pub fn from_args(args: &SinkholeArgs) -> Self {
        let text = |duration| Some(DurationValue::Text(format_duration(duration)));
        Self {
            data_sources: Some(args.effective_sources()),
            target_rate: Some(args.target_rate),
            duration: Some(
                args.duration
                    .map_or(DurationValue::Number(0), |duration| {
                        DurationValue::Text(format_duration(duration))
                    }),
            ),
            verbose_logging: Some(args.verbose),
            save_metrics: Some(!args.no_save_metrics),
            metrics_file: Some(args.metrics_file.clone()),
            concurrency_factor: args.workers.map(|workers| workers.get()),
            use_randomization: Some(!args.no_randomize),
            request_timeout: text(args.request_timeout),
            connect_timeout: text(args.connect_timeout),
            max_attempts: Some(args.max_attempts.get()),
            retry_backoff: text(args.retry_backoff),
            save_interval: text(args.save_interval),
            metrics_log: args.metrics_log.clone(),
            progress_interval: text(args.progress_interval),
            no_color: Some(args.no_color),
        }
    }
}

/// Writes the effective settings to `path` as TOML or JSON, chosen by
/// extension.
///
/// # Errors
///
/// Returns an error when the extension is unsupported or the file cannot be
/// written.
pub fn save_config(path: &Path, args: &SinkholeArgs) -> AppResult<()> {
    let config = ConfigFile::from_args(args);
    let mut content = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::to_string_pretty(&config)
            .map_err(|err| AppError::config(ConfigError::SerializeToml { source: err }))?,
        Some("json") => serde_json::to_string_pretty(&config)
            .map_err(|err| AppError::config(ConfigError::SerializeJson { source: err }))?,
        Some(ext) => {
            return Err(AppError::config(ConfigError::UnsupportedExtension {
                ext: ext.to_owned(),
            }));
        }
        None => return Err(AppError::config(ConfigError::MissingExtension)),
    };
    if !content.ends_with('\n') {
        content.push('\n');
    }

    let write = |path: &Path| -> std::io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content.as_bytes())
    };
    write(path).map_err(|err| {
        AppError::config(ConfigError::WriteConfig {
            path: path.to_path_buf(),
            source: err,
        })
    })
}
