use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep_until};
use tracing::{info, warn};

use crate::args::SinkholeArgs;
use crate::error::AppResult;
use crate::fetch::{FetchConfig, FetchPool};
use crate::metrics::{Collector, Stats};
use crate::shutdown::shutdown_channel;
use crate::system::banner::print_cli_banner;
use crate::system::shutdown_handlers::setup_signal_shutdown_handler;

use super::export::write_stats_json;
use super::progress::ProgressReporter;
use super::summary::print_summary;

enum StopReason {
    Interrupted,
    DurationReached,
}

/// Runs the fetch pool until interrupted or until `--duration` elapses, then
/// writes the final stats and prints a summary.
///
/// # Errors
///
/// Returns an error when the configuration is invalid or the HTTP client
/// cannot be built.
pub async fn run_local(args: SinkholeArgs) -> AppResult<()> {
    let started_local = chrono::Local::now();
    let config = FetchConfig::from_args(&args);
    let worker_estimate = config.resolve_worker_count();
    let collector = Collector::new();
    let mut pool = FetchPool::new(config, collector.clone())?;

    if !args.no_banner {
        print_cli_banner(args.no_color, &banner_details(&args, worker_estimate));
    }

    if let Some(path) = args.effective_metrics_log(&started_local) {
        match collector.attach_log_file(Path::new(&path)).await {
            Ok(()) => info!("Logging rate samples to {}", path),
            Err(err) => warn!("Rate sample log disabled: {}", err),
        }
    }
    let metrics_path = (!args.no_save_metrics).then(|| PathBuf::from(&args.metrics_file));

    let (shutdown_tx, mut shutdown_rx) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);

    pool.start();
    let run_start = Instant::now();
    let deadline = args
        .duration
        .and_then(|duration| run_start.checked_add(duration));
    if let Some(duration) = args.duration {
        info!("Will run for {:?}.", duration);
    }

    let mut progress_ticker = ticker(run_start, args.progress_interval);
    let mut save_ticker = ticker(run_start, args.save_interval);
    let mut progress = ProgressReporter::new(args.no_color);

    let reason = loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break StopReason::Interrupted,
            () = wait_for_deadline(deadline) => break StopReason::DurationReached,
            _ = progress_ticker.tick() => {
                if let Err(err) = progress.report(&collector.stats()) {
                    warn!("Failed to print progress: {}", err);
                }
            }
            _ = save_ticker.tick(), if metrics_path.is_some() => {
                if let Some(path) = metrics_path.as_deref() {
                    save_stats(path, &collector.stats()).await;
                }
            }
        }
    };

    if let Err(err) = progress.finish() {
        warn!("Failed to print progress: {}", err);
    }
    match reason {
        StopReason::Interrupted => info!("Shutting down."),
        StopReason::DurationReached => info!("Duration completed, shutting down."),
    }
    drop(shutdown_tx.send(()));

    let report = pool.stop().await;
    let stats = collector.stats();
    if let Some(path) = metrics_path.as_deref() {
        if save_stats(path, &stats).await {
            info!("Final metrics saved to {}", path.display());
        }
    }
    print_summary(&stats, &report, args.no_color);

    if let Err(err) = signal_handle.await {
        warn!("Signal handler ended abnormally: {}", err);
    }
    Ok(())
}

fn ticker(start: Instant, period: Duration) -> tokio::time::Interval {
    let period = period.max(Duration::from_millis(1));
    let first = start.checked_add(period).unwrap_or(start);
    let mut ticker = interval_at(first, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

async fn save_stats(path: &Path, stats: &Stats) -> bool {
    match write_stats_json(path, stats).await {
        Ok(()) => true,
        Err(err) => {
            warn!("Failed to save metrics: {}", err);
            false
        }
    }
}

pub(crate) fn banner_details(args: &SinkholeArgs, workers: usize) -> String {
    let target = if args.target_rate > 0 {
        format!("target {} MB/min", args.target_rate)
    } else {
        "unthrottled".to_owned()
    };
    let duration = args.duration.map_or_else(
        || "until interrupted".to_owned(),
        |duration| format!("for {}", super::export::humanize_duration(duration)),
    );
    format!(
        "{} | {} workers | {} sources | {}",
        target,
        workers,
        args.effective_sources().len(),
        duration
    )
}
