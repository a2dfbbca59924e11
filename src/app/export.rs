use std::path::Path;
use std::time::Duration;

use chrono::SecondsFormat;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::MetricsError;
use crate::metrics::Stats;

/// Writes a pretty JSON snapshot of `stats`, replacing any previous file.
///
/// # Errors
///
/// Returns an error when the file or its parent directory cannot be written.
pub async fn write_stats_json(path: &Path, stats: &Stats) -> Result<(), MetricsError> {
    let history: Vec<serde_json::Value> = stats
        .rate_history
        .iter()
        .map(|point| {
            serde_json::json!({
                "timestamp": point.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                "rate_mb_per_min": point.rate
            })
        })
        .collect();

    let payload = serde_json::json!({
        "bytes_transferred": stats.bytes_transferred,
        "elapsed_ms": stats.elapsed.as_millis(),
        "elapsed": humanize_duration(stats.elapsed),
        "start_time": stats.started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        "current_rate_mb_per_min": stats.current_rate,
        "peak_rate_mb_per_min": stats.peak_rate,
        "average_rate_mb_per_min": stats.average_rate,
        "total_megabytes": stats.total_megabytes,
        "total_gigabytes": stats.total_gigabytes(),
        "rate_history": history,
        "last_updated": stats.last_updated.to_rfc3339_opts(SecondsFormat::Secs, true)
    });
    let json =
        serde_json::to_vec_pretty(&payload).map_err(|err| MetricsError::SerializeStats { source: err })?;

    let write_err = |err: std::io::Error| MetricsError::WriteStats {
        path: path.to_path_buf(),
        source: err,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    let file = tokio::fs::File::create(path).await.map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&json).await.map_err(write_err)?;
    writer.write_all(b"\n").await.map_err(write_err)?;
    writer.flush().await.map_err(write_err)?;
    Ok(())
}

/// `1h2m3s` style rendering, rounded to whole seconds.
pub(crate) fn humanize_duration(duration: Duration) -> String {
    let mut secs = duration.as_secs();
    if duration.subsec_millis() >= 500 {
        secs = secs.saturating_add(1);
    }
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
