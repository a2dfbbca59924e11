use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::{
    fs::File,
    io::{AsyncWriteExt, BufWriter},
    sync::mpsc,
    task::JoinHandle,
};
use tracing::warn;

use crate::error::MetricsError;

use super::types::{bytes_to_megabytes, mb_per_min_to_mb_per_sec};

/// The rate column is MB/s; everything else in the crate reports MB/min.
pub(crate) const LOG_HEADER: &str = "timestamp,bytes_transferred,rate_mbps,total_mb";

/// Append-only CSV file fed by a dedicated writer task.
///
/// Rows are formatted by the sampler and handed over a channel, so no file
/// I/O happens while the sampler state is locked.
pub(crate) struct LogSink {
    path: PathBuf,
    rows: mpsc::UnboundedSender<String>,
    writer: JoinHandle<Result<(), MetricsError>>,
}

impl LogSink {
    /// Creates the file, writes the header, and starts the writer task.
    pub(crate) async fn create(path: &Path) -> Result<Self, MetricsError> {
        let create_err = |err| MetricsError::CreateLog {
            path: path.to_path_buf(),
            source: err,
        };
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(create_err)?;
        }
        let file = File::create(path).await.map_err(create_err)?;
        let mut writer = BufWriter::new(file);
        let header = format!("{}\n", LOG_HEADER);
        write_and_flush(&mut writer, &header, "writing metrics log header").await?;

        let (rows, rows_rx) = mpsc::unbounded_channel();
        let writer = spawn_writer(path.to_path_buf(), writer, rows_rx);
        Ok(Self {
            path: path.to_path_buf(),
            rows,
            writer,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Sending fails once the writer has given up on the file.
    pub(crate) fn sender(&self) -> mpsc::UnboundedSender<String> {
        self.rows.clone()
    }

    /// Closes the channel and waits until every queued row is on disk.
    pub(crate) async fn finish(self) -> Result<(), MetricsError> {
        let Self { rows, writer, .. } = self;
        drop(rows);
        match writer.await {
            Ok(result) => result,
            Err(err) => Err(MetricsError::Io {
                context: "joining metrics log writer",
                source: std::io::Error::other(err.to_string()),
            }),
        }
    }
}

fn spawn_writer(
    path: PathBuf,
    mut writer: BufWriter<File>,
    mut rows_rx: mpsc::UnboundedReceiver<String>,
) -> JoinHandle<Result<(), MetricsError>> {
    tokio::spawn(async move {
        while let Some(mut row) = rows_rx.recv().await {
            row.push('\n');
            // Flush per row so a killed process keeps every finished sample.
            if let Err(err) = write_and_flush(&mut writer, &row, "appending to metrics log").await
            {
                warn!(
                    "Metrics log '{}' stopped accepting samples: {}",
                    path.display(),
                    err
                );
                return Err(err);
            }
        }
        writer.flush().await.map_err(|err| MetricsError::Io {
            context: "flushing metrics log",
            source: err,
        })
    })
}

async fn write_and_flush(
    writer: &mut BufWriter<File>,
    text: &str,
    context: &'static str,
) -> Result<(), MetricsError> {
    writer
        .write_all(text.as_bytes())
        .await
        .map_err(|err| MetricsError::Io {
            context,
            source: err,
        })?;
    writer.flush().await.map_err(|err| MetricsError::Io {
        context,
        source: err,
    })
}

pub(crate) fn format_record(timestamp: DateTime<Utc>, total_bytes: u64, rate: f64) -> String {
    format!(
        "{},{},{:.2},{:.2}",
        timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        total_bytes,
        mb_per_min_to_mb_per_sec(rate),
        bytes_to_megabytes(total_bytes)
    )
}
