use super::logging::{LOG_HEADER, format_record};
use super::{Collector, CollectorSettings, RatePoint};
use crate::error::{AppError, AppResult, MetricsError};
use std::future::Future;
use std::time::Duration;
use tempfile::tempdir;
use tokio::time::Instant;

const MIB: u64 = 1024 * 1024;
const NEVER: Duration = Duration::from_secs(3600);

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::metrics(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

fn manual_collector(history_limit: usize) -> Collector {
    Collector::with_settings(CollectorSettings {
        sample_interval: NEVER,
        history_limit,
    })
}

fn tick_at(base: Instant, index: u64) -> AppResult<Instant> {
    let offset = Duration::from_secs(10)
        .checked_mul(u32::try_from(index).unwrap_or(u32::MAX))
        .ok_or_else(|| AppError::metrics("tick offset overflow"))?;
    base.checked_add(offset)
        .ok_or_else(|| AppError::metrics("instant overflow"))
}

#[test]
fn concurrent_add_bytes_never_loses_updates() -> AppResult<()> {
    let collector = Collector::new();
    let callers = 8u64;
    let calls = 10_000u64;
    let amount = 4096u64;

    std::thread::scope(|scope| {
        for _ in 0..callers {
            let collector = collector.clone();
            scope.spawn(move || {
                for _ in 0..calls {
                    collector.add_bytes(amount);
                }
            });
        }
    });

    let expected = callers * calls * amount;
    if collector.total_bytes() != expected {
        return Err(AppError::metrics(format!(
            "expected {} bytes, counted {}",
            expected,
            collector.total_bytes()
        )));
    }
    if collector.stats().bytes_transferred != expected {
        return Err(AppError::metrics("snapshot disagrees with counter"));
    }
    Ok(())
}

#[test]
fn stats_before_first_tick_use_whole_run_estimate() -> AppResult<()> {
    run_async_test(async {
        let collector = manual_collector(60);
        collector.start();
        collector.add_bytes(10 * MIB);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let stats = collector.stats();
        collector.stop().await;

        if !stats.rate_history.is_empty() {
            return Err(AppError::metrics("expected no samples yet"));
        }
        if stats.current_rate <= 0.0 {
            return Err(AppError::metrics(format!(
                "expected a positive estimate, got {}",
                stats.current_rate
            )));
        }
        let drift = (stats.current_rate - stats.average_rate).abs();
        if drift > stats.average_rate * 1e-6 {
            return Err(AppError::metrics(format!(
                "estimate {} should match average {}",
                stats.current_rate, stats.average_rate
            )));
        }
        if (stats.total_megabytes - 10.0).abs() > 1e-9 {
            return Err(AppError::metrics("unexpected total_megabytes"));
        }
        if stats.peak_rate.abs() > f64::EPSILON {
            return Err(AppError::metrics("peak should stay zero without samples"));
        }
        Ok(())
    })
}

#[test]
fn history_keeps_exactly_the_newest_samples() -> AppResult<()> {
    run_async_test(async {
        let limit = 5;
        let collector = manual_collector(limit);
        collector.start();
        let base = Instant::now();

        let mut recorded: Vec<RatePoint> = Vec::new();
        for index in 1..=12u64 {
            collector.add_bytes(index * MIB);
            let point = collector
                .sample_at(tick_at(base, index)?)
                .ok_or_else(|| AppError::metrics("expected a sample"))?;
            recorded.push(point);

            let history = collector.stats().rate_history;
            if history.len() > limit {
                return Err(AppError::metrics(format!(
                    "history grew to {}",
                    history.len()
                )));
            }
        }
        collector.stop().await;

        let history = collector.stats().rate_history;
        let newest = recorded
            .get(recorded.len().saturating_sub(limit)..)
            .ok_or_else(|| AppError::metrics("not enough samples recorded"))?;
        if history.as_slice() != newest {
            return Err(AppError::metrics(format!(
                "history {:?} != newest {:?}",
                history, newest
            )));
        }
        if history.windows(2).any(|pair| match (pair.first(), pair.last()) {
            (Some(older), Some(newer)) => older.timestamp >= newer.timestamp,
            _ => true,
        }) {
            return Err(AppError::metrics("history is not in time order"));
        }
        Ok(())
    })
}

#[test]
fn peak_rate_is_monotonic_and_bounds_every_sample() -> AppResult<()> {
    run_async_test(async {
        let collector = manual_collector(60);
        collector.start();
        let base = Instant::now();

        let mut previous_peak = 0.0f64;
        let mut highest_sample = 0.0f64;
        for (index, mib) in [5u64, 1, 8, 2, 8, 0].into_iter().enumerate() {
            collector.add_bytes(mib * MIB);
            let index = u64::try_from(index).unwrap_or(u64::MAX).saturating_add(1);
            let point = collector
                .sample_at(tick_at(base, index)?)
                .ok_or_else(|| AppError::metrics("expected a sample"))?;
            highest_sample = highest_sample.max(point.rate);

            let stats = collector.stats();
            if stats.peak_rate < previous_peak {
                return Err(AppError::metrics(format!(
                    "peak dropped from {} to {}",
                    previous_peak, stats.peak_rate
                )));
            }
            if stats
                .rate_history
                .iter()
                .any(|sample| sample.rate > stats.peak_rate)
            {
                return Err(AppError::metrics("a sample exceeds the peak"));
            }
            previous_peak = stats.peak_rate;
        }
        collector.stop().await;

        if (previous_peak - highest_sample).abs() > 1e-9 {
            return Err(AppError::metrics(format!(
                "peak {} should equal highest sample {}",
                previous_peak, highest_sample
            )));
        }
        // 8 MiB over ten seconds.
        if (highest_sample - 48.0).abs() > 0.5 {
            return Err(AppError::metrics(format!(
                "unexpected highest sample {}",
                highest_sample
            )));
        }
        Ok(())
    })
}

#[test]
fn sampler_ticks_in_background_until_stopped() -> AppResult<()> {
    run_async_test(async {
        let collector = Collector::with_settings(CollectorSettings {
            sample_interval: Duration::from_millis(40),
            history_limit: 60,
        });
        collector.start();
        collector.add_bytes(MIB);
        tokio::time::sleep(Duration::from_millis(220)).await;

        let running = collector.stats().rate_history.len();
        if running < 2 {
            return Err(AppError::metrics(format!(
                "expected background samples, got {}",
                running
            )));
        }

        collector.stop().await;
        let at_stop = collector.stats().rate_history.len();
        tokio::time::sleep(Duration::from_millis(160)).await;
        let after = collector.stats().rate_history.len();
        if after != at_stop {
            return Err(AppError::metrics(format!(
                "sampler kept running after stop: {} -> {}",
                at_stop, after
            )));
        }
        if collector.is_running() {
            return Err(AppError::metrics("collector still reports running"));
        }
        Ok(())
    })
}

#[test]
fn start_is_a_no_op_while_running() -> AppResult<()> {
    run_async_test(async {
        let collector = manual_collector(60);
        collector.start();
        collector.add_bytes(3 * MIB);
        collector.start();
        if collector.total_bytes() != 3 * MIB {
            return Err(AppError::metrics("second start reset the counter"));
        }

        collector.stop().await;
        collector.start();
        if collector.total_bytes() != 0 {
            return Err(AppError::metrics("restart should reset the counter"));
        }
        collector.stop().await;
        Ok(())
    })
}

#[test]
fn stop_freezes_elapsed_and_keeps_stats_readable() -> AppResult<()> {
    run_async_test(async {
        let collector = manual_collector(60);
        collector.start();
        collector.add_bytes(MIB);
        tokio::time::sleep(Duration::from_millis(20)).await;
        collector.stop().await;
        collector.stop().await;

        let first = collector.stats();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let second = collector.stats();
        if first.elapsed != second.elapsed {
            return Err(AppError::metrics(format!(
                "elapsed moved after stop: {:?} -> {:?}",
                first.elapsed, second.elapsed
            )));
        }
        if second.bytes_transferred != MIB {
            return Err(AppError::metrics("bytes lost after stop"));
        }
        if collector.sample_at(Instant::now()).is_some() {
            return Err(AppError::metrics("stopped collector should not sample"));
        }
        Ok(())
    })
}

#[test]
fn log_file_gets_header_and_one_row_per_sample() -> AppResult<()> {
    run_async_test(async {
        let dir = tempdir().map_err(|err| AppError::metrics(format!("tempdir failed: {}", err)))?;
        let path = dir.path().join("nested").join("samples.csv");

        let collector = manual_collector(60);
        collector.attach_log_file(&path).await?;
        collector.start();
        let base = Instant::now();

        collector.add_bytes(2 * MIB);
        collector.sample_at(tick_at(base, 1)?);
        collector.add_bytes(MIB);
        collector.sample_at(tick_at(base, 2)?);
        collector.stop().await;

        let content = std::fs::read_to_string(&path)
            .map_err(|err| AppError::metrics(format!("read failed: {}", err)))?;
        let lines: Vec<&str> = content.lines().collect();
        if lines.first().copied() != Some(LOG_HEADER) {
            return Err(AppError::metrics(format!("unexpected header: {:?}", lines.first())));
        }
        if lines.len() != 3 {
            return Err(AppError::metrics(format!("expected 2 rows, got {:?}", lines)));
        }
        let last = lines
            .last()
            .ok_or_else(|| AppError::metrics("missing last row"))?;
        let fields: Vec<&str> = last.split(',').collect();
        if fields.len() != 4 {
            return Err(AppError::metrics(format!("unexpected row: {}", last)));
        }
        if fields.get(1).copied() != Some("3145728") || fields.get(3).copied() != Some("3.00") {
            return Err(AppError::metrics(format!("unexpected cumulative fields: {}", last)));
        }
        // 1 MiB over ten seconds is 0.1 MB/s.
        if fields.get(2).copied() != Some("0.10") {
            return Err(AppError::metrics(format!("unexpected rate field: {}", last)));
        }
        Ok(())
    })
}

#[test]
fn failed_log_attach_leaves_counting_intact() -> AppResult<()> {
    run_async_test(async {
        let dir =
            tempdir().map_err(|err| AppError::metrics(format!("tempdir failed: {}", err)))?;
        let collector = Collector::new();

        match collector.attach_log_file(dir.path()).await {
            Err(MetricsError::CreateLog { .. }) => {}
            Err(err) => {
                return Err(AppError::metrics(format!("unexpected error: {}", err)));
            }
            Ok(()) => {
                return Err(AppError::metrics("directory path should not open as a log"));
            }
        }

        collector.add_bytes(42);
        if collector.total_bytes() != 42 {
            return Err(AppError::metrics("counter broken after failed attach"));
        }
        Ok(())
    })
}

#[test]
fn stop_returns_after_every_queued_row_is_written() -> AppResult<()> {
    run_async_test(async {
        let dir =
            tempdir().map_err(|err| AppError::metrics(format!("tempdir failed: {}", err)))?;
        let path = dir.path().join("burst.csv");
        let samples = 250u64;

        let collector = manual_collector(5);
        collector.attach_log_file(&path).await?;
        collector.start();
        let base = Instant::now();

        // The writer task cannot run between these samples on a current-thread
        // runtime, so every row is still queued when stop is called.
        for index in 1..=samples {
            collector.add_bytes(MIB);
            collector
                .sample_at(tick_at(base, index)?)
                .ok_or_else(|| AppError::metrics("expected a sample"))?;
            if collector.stats().rate_history.len() > 5 {
                return Err(AppError::metrics("history exceeded its limit"));
            }
        }
        collector.stop().await;

        let content = std::fs::read_to_string(&path)
            .map_err(|err| AppError::metrics(format!("read failed: {}", err)))?;
        let rows = content.lines().skip(1).count();
        if u64::try_from(rows).unwrap_or(u64::MAX) != samples {
            return Err(AppError::metrics(format!(
                "expected {} rows on disk after stop, found {}",
                samples, rows
            )));
        }
        let expected_total = format!(",{},", samples * MIB);
        if !content.lines().last().is_some_and(|row| row.contains(&expected_total)) {
            return Err(AppError::metrics("last row does not carry the final total"));
        }
        Ok(())
    })
}

#[test]
fn reattaching_closes_the_previous_log() -> AppResult<()> {
    run_async_test(async {
        let dir =
            tempdir().map_err(|err| AppError::metrics(format!("tempdir failed: {}", err)))?;
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");

        let collector = manual_collector(60);
        collector.attach_log_file(&first).await?;
        collector.start();
        let base = Instant::now();
        collector.add_bytes(MIB);
        collector.sample_at(tick_at(base, 1)?);

        collector.attach_log_file(&second).await?;
        collector.add_bytes(MIB);
        collector.sample_at(tick_at(base, 2)?);
        collector.stop().await;

        let count_rows = |path: &std::path::Path| -> AppResult<usize> {
            std::fs::read_to_string(path)
                .map(|content| content.lines().count())
                .map_err(|err| AppError::metrics(format!("read failed: {}", err)))
        };
        let (first_lines, second_lines) = (count_rows(&first)?, count_rows(&second)?);
        if first_lines != 2 || second_lines != 2 {
            return Err(AppError::metrics(format!(
                "expected header plus one row in each file, got {} and {}",
                first_lines, second_lines
            )));
        }
        Ok(())
    })
}

#[test]
fn log_record_formats_rate_in_mb_per_second() -> AppResult<()> {
    use chrono::TimeZone;

    let timestamp = chrono::Utc
        .with_ymd_and_hms(2024, 5, 1, 12, 0, 30)
        .single()
        .ok_or_else(|| AppError::metrics("invalid timestamp"))?;
    let row = format_record(timestamp, 5 * MIB, 120.0);
    if row != "2024-05-01T12:00:30Z,5242880,2.00,5.00" {
        return Err(AppError::metrics(format!("unexpected row: {}", row)));
    }
    Ok(())
}
