use super::{apply_config, load_config_file, parse_duration_value, save_config};
use super::types::{ConfigFile, DurationValue};
use super::parse::format_duration;
use clap::{ArgMatches, CommandFactory, FromArgMatches};
use std::time::Duration;
use tempfile::tempdir;

use crate::args::SinkholeArgs;
use crate::error::{AppError, AppResult, ConfigError};

fn parse_cli(argv: &[&str]) -> AppResult<(SinkholeArgs, ArgMatches)> {
    let matches = SinkholeArgs::command().try_get_matches_from(argv.iter().copied())?;
    let args = SinkholeArgs::from_arg_matches(&matches)?;
    Ok((args, matches))
}

#[test]
fn parse_toml_config_with_original_field_names() -> AppResult<()> {
    let dir = tempdir()?;
    let path = dir.path().join("sinkhole.toml");
    let content = r#"
data_sources = ["http://mirror-a.test/1GB.bin", "http://mirror-b.test/1GB.bin"]
target_rate = 2048
duration = 30
verbose_logging = true
save_metrics = false
metrics_file = "out/stats.json"
concurrency_factor = 12
use_randomization = false
request_timeout = 45
"#;
    std::fs::write(&path, content)?;

    let config = load_config_file(&path)?;
    let sources = config
        .data_sources
        .as_ref()
        .ok_or_else(|| AppError::config("Expected data_sources"))?;
    if sources.len() != 2 {
        return Err(AppError::config(format!("Unexpected sources: {:?}", sources)));
    }
    if config.target_rate != Some(2048) {
        return Err(AppError::config("Unexpected target_rate"));
    }
    if config.duration != Some(DurationValue::Number(30)) {
        return Err(AppError::config("Unexpected duration"));
    }
    if config.request_timeout != Some(DurationValue::Number(45)) {
        return Err(AppError::config("Unexpected request_timeout"));
    }
    if config.concurrency_factor != Some(12) {
        return Err(AppError::config("Unexpected concurrency_factor"));
    }
    Ok(())
}

#[test]
fn parse_json_config_with_duration_strings() -> AppResult<()> {
    let dir = tempdir()?;
    let path = dir.path().join("sinkhole.json");
    let content = r#"{
  "data_sources": ["https://mirror.test/big.bin"],
  "target_rate": 0,
  "duration": "90s",
  "retry_backoff": "250ms",
  "progress_interval": "2s"
}"#;
    std::fs::write(&path, content)?;

    let config = load_config_file(&path)?;
    if config.duration != Some(DurationValue::Text("90s".to_owned())) {
        return Err(AppError::config("Unexpected duration"));
    }
    if config.retry_backoff != Some(DurationValue::Text("250ms".to_owned())) {
        return Err(AppError::config("Unexpected retry_backoff"));
    }
    if config.target_rate != Some(0) {
        return Err(AppError::config("Unexpected target_rate"));
    }
    Ok(())
}

#[test]
fn load_config_file_rejects_unknown_extension() -> AppResult<()> {
    let dir = tempdir()?;
    let path = dir.path().join("sinkhole.yaml");
    std::fs::write(&path, "target_rate: 1")?;

    match load_config_file(&path) {
        Err(AppError::Config(ConfigError::UnsupportedExtension { ext })) if ext == "yaml" => Ok(()),
        Err(err) => Err(AppError::config(format!("Unexpected error: {}", err))),
        Ok(_) => Err(AppError::config("Expected unsupported extension")),
    }
}

#[test]
fn load_config_file_reports_parse_errors() -> AppResult<()> {
    let dir = tempdir()?;
    let path = dir.path().join("sinkhole.json");
    std::fs::write(&path, "{ \"target_rate\": \"fast\" }")?;

    match load_config_file(&path) {
        Err(AppError::Config(ConfigError::ParseJson { .. })) => Ok(()),
        Err(err) => Err(AppError::config(format!("Unexpected error: {}", err))),
        Ok(_) => Err(AppError::config("Expected a parse error")),
    }
}

#[test]
fn apply_config_fills_unset_options() -> AppResult<()> {
    let config = ConfigFile {
        data_sources: Some(vec!["http://mirror.test/a.bin".to_owned()]),
        target_rate: Some(512),
        duration: Some(DurationValue::Number(2)),
        verbose_logging: Some(true),
        save_metrics: Some(false),
        metrics_file: Some("stats.json".to_owned()),
        concurrency_factor: Some(6),
        use_randomization: Some(false),
        request_timeout: Some(DurationValue::Number(20)),
        connect_timeout: Some(DurationValue::Text("1500ms".to_owned())),
        max_attempts: Some(5),
        retry_backoff: Some(DurationValue::Text("1s".to_owned())),
        save_interval: Some(DurationValue::Text("5m".to_owned())),
        metrics_log: Some("samples.csv".to_owned()),
        progress_interval: Some(DurationValue::Number(3)),
        no_color: Some(true),
    };
    let (mut args, matches) = parse_cli(&["sinkhole"])?;

    apply_config(&mut args, &matches, &config)?;

    if args.sources != vec!["http://mirror.test/a.bin".to_owned()] {
        return Err(AppError::config("Unexpected sources"));
    }
    if args.target_rate != 512 {
        return Err(AppError::config("Unexpected target_rate"));
    }
    if args.duration != Some(Duration::from_secs(120)) {
        return Err(AppError::config(format!("Unexpected duration: {:?}", args.duration)));
    }
    if !args.verbose || !args.no_save_metrics || !args.no_randomize || !args.no_color {
        return Err(AppError::config("Unexpected boolean flags"));
    }
    if args.metrics_file != "stats.json" {
        return Err(AppError::config("Unexpected metrics_file"));
    }
    if args.workers.map(|workers| workers.get()) != Some(6) {
        return Err(AppError::config("Unexpected workers"));
    }
    if args.request_timeout != Duration::from_secs(20) {
        return Err(AppError::config("Unexpected request_timeout"));
    }
    if args.connect_timeout != Duration::from_millis(1500) {
        return Err(AppError::config("Unexpected connect_timeout"));
    }
    if args.max_attempts.get() != 5 {
        return Err(AppError::config("Unexpected max_attempts"));
    }
    if args.retry_backoff != Duration::from_secs(1) {
        return Err(AppError::config("Unexpected retry_backoff"));
    }
    if args.save_interval != Duration::from_secs(300) {
        return Err(AppError::config("Unexpected save_interval"));
    }
    if args.metrics_log.as_deref() != Some("samples.csv") {
        return Err(AppError::config("Unexpected metrics_log"));
    }
    if args.progress_interval != Duration::from_secs(3) {
        return Err(AppError::config("Unexpected progress_interval"));
    }
    Ok(())
}

#[test]
fn apply_config_respects_cli_overrides() -> AppResult<()> {
    let config = ConfigFile {
        data_sources: Some(vec!["http://from-config.test/a.bin".to_owned()]),
        target_rate: Some(10),
        verbose_logging: Some(false),
        ..ConfigFile::default()
    };
    let (mut args, matches) = parse_cli(&[
        "sinkhole",
        "--source",
        "http://from-cli.test/a.bin",
        "--rate",
        "99",
        "--verbose",
    ])?;

    apply_config(&mut args, &matches, &config)?;

    if args.sources != vec!["http://from-cli.test/a.bin".to_owned()] {
        return Err(AppError::config("Expected CLI sources to win"));
    }
    if args.target_rate != 99 {
        return Err(AppError::config("Expected CLI rate to win"));
    }
    if !args.verbose {
        return Err(AppError::config("Expected CLI verbose to win"));
    }
    Ok(())
}

#[test]
fn apply_config_zero_duration_means_unlimited() -> AppResult<()> {
    let config = ConfigFile {
        duration: Some(DurationValue::Number(0)),
        ..ConfigFile::default()
    };
    let (mut args, matches) = parse_cli(&["sinkhole"])?;
    args.duration = Some(Duration::from_secs(5));

    apply_config(&mut args, &matches, &config)?;

    if args.duration.is_some() {
        return Err(AppError::config("Expected unlimited duration"));
    }
    Ok(())
}

#[test]
fn apply_config_rejects_empty_sources() -> AppResult<()> {
    let config = ConfigFile {
        data_sources: Some(Vec::new()),
        ..ConfigFile::default()
    };
    let (mut args, matches) = parse_cli(&["sinkhole"])?;

    match apply_config(&mut args, &matches, &config) {
        Err(AppError::Config(ConfigError::EmptySources)) => Ok(()),
        Err(err) => Err(AppError::config(format!("Unexpected error: {}", err))),
        Ok(()) => Err(AppError::config("Expected empty sources to be rejected")),
    }
}

#[test]
fn apply_config_rejects_zero_workers() -> AppResult<()> {
    let config = ConfigFile {
        concurrency_factor: Some(0),
        ..ConfigFile::default()
    };
    let (mut args, matches) = parse_cli(&["sinkhole"])?;

    match apply_config(&mut args, &matches, &config) {
        Err(AppError::Config(ConfigError::FieldMustBePositive { field, .. }))
            if field == "concurrency_factor" =>
        {
            Ok(())
        }
        Err(err) => Err(AppError::config(format!("Unexpected error: {}", err))),
        Ok(()) => Err(AppError::config("Expected zero workers to be rejected")),
    }
}

#[test]
fn apply_config_rejects_bad_duration_unit() -> AppResult<()> {
    let config = ConfigFile {
        request_timeout: Some(DurationValue::Text("5d".to_owned())),
        ..ConfigFile::default()
    };
    let (mut args, matches) = parse_cli(&["sinkhole"])?;

    match apply_config(&mut args, &matches, &config) {
        Err(AppError::Config(ConfigError::InvalidDurationUnit { unit })) if unit == "d" => Ok(()),
        Err(err) => Err(AppError::config(format!("Unexpected error: {}", err))),
        Ok(()) => Err(AppError::config("Expected invalid unit")),
    }
}

#[test]
fn parse_duration_value_accepts_units() -> AppResult<()> {
    let cases = [
        ("10s", Duration::from_secs(10)),
        ("500ms", Duration::from_millis(500)),
        ("2m", Duration::from_secs(120)),
        ("1h", Duration::from_secs(3600)),
        ("7", Duration::from_secs(7)),
    ];
    for (input, expected) in cases {
        let parsed = parse_duration_value(input)?;
        if parsed != expected {
            return Err(AppError::config(format!(
                "Unexpected duration for {}: {:?}",
                input, parsed
            )));
        }
    }
    if parse_duration_value("0s").is_ok() {
        return Err(AppError::config("Expected zero duration to be rejected"));
    }
    if parse_duration_value("").is_ok() {
        return Err(AppError::config("Expected empty duration to be rejected"));
    }
    Ok(())
}

#[test]
fn format_duration_uses_largest_exact_unit() -> AppResult<()> {
    let cases = [
        (Duration::from_millis(500), "500ms"),
        (Duration::from_millis(1500), "1500ms"),
        (Duration::from_secs(45), "45s"),
        (Duration::from_secs(120), "2m"),
        (Duration::from_secs(7200), "2h"),
    ];
    for (duration, expected) in cases {
        let formatted = format_duration(duration);
        if formatted != expected {
            return Err(AppError::config(format!(
                "Unexpected format for {:?}: {}",
                duration, formatted
            )));
        }
    }
    Ok(())
}

#[test]
fn save_config_writes_loadable_toml() -> AppResult<()> {
    let dir = tempdir()?;
    let path = dir.path().join("nested").join("saved.toml");
    let (args, _) = parse_cli(&[
        "sinkhole",
        "--source",
        "http://mirror.test/a.bin",
        "--rate",
        "300",
        "--duration",
        "10m",
        "--workers",
        "4",
    ])?;

    save_config(&path, &args)?;
    let loaded = load_config_file(&path)?;

    if loaded.data_sources != Some(vec!["http://mirror.test/a.bin".to_owned()]) {
        return Err(AppError::config("Unexpected saved sources"));
    }
    if loaded.target_rate != Some(300) {
        return Err(AppError::config("Unexpected saved rate"));
    }
    if loaded.duration != Some(DurationValue::Text("10m".to_owned())) {
        return Err(AppError::config(format!(
            "Unexpected saved duration: {:?}",
            loaded.duration
        )));
    }
    if loaded.concurrency_factor != Some(4) {
        return Err(AppError::config("Unexpected saved workers"));
    }
    if loaded.retry_backoff != Some(DurationValue::Text("500ms".to_owned())) {
        return Err(AppError::config("Unexpected saved retry_backoff"));
    }
    Ok(())
}

#[test]
fn save_config_round_trips_through_apply() -> AppResult<()> {
    let dir = tempdir()?;
    let path = dir.path().join("saved.json");
    let (original, _) = parse_cli(&[
        "sinkhole",
        "--rate",
        "-1",
        "--timeout",
        "90s",
        "--no-randomize",
        "--retries",
        "7",
    ])?;

    save_config(&path, &original)?;
    let loaded = load_config_file(&path)?;
    let (mut args, matches) = parse_cli(&["sinkhole"])?;
    apply_config(&mut args, &matches, &loaded)?;

    if args.target_rate != -1 || args.request_timeout != Duration::from_secs(90) {
        return Err(AppError::config("Rate or timeout lost in round trip"));
    }
    if !args.no_randomize || args.max_attempts.get() != 7 {
        return Err(AppError::config("Flags lost in round trip"));
    }
    if args.duration.is_some() {
        return Err(AppError::config("Expected unlimited duration"));
    }
    if args.sources != original.effective_sources() {
        return Err(AppError::config("Expected default sources to be saved"));
    }
    Ok(())
}

#[test]
fn save_config_rejects_missing_extension() -> AppResult<()> {
    let dir = tempdir()?;
    let path = dir.path().join("saved");
    let (args, _) = parse_cli(&["sinkhole"])?;

    match save_config(&path, &args) {
        Err(AppError::Config(ConfigError::MissingExtension)) => Ok(()),
        Err(err) => Err(AppError::config(format!("Unexpected error: {}", err))),
        Ok(()) => Err(AppError::config("Expected missing extension error")),
    }
}
