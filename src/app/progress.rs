use std::io::{IsTerminal, Write};
use std::time::Duration;

use crossterm::{
    cursor, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};

use crate::metrics::{Stats, bytes_to_megabytes, rate_mb_per_min};

use super::export::humanize_duration;

/// Periodic status line. Rewrites a single line in place on a terminal and
/// prints one line per tick otherwise.
pub(crate) struct ProgressReporter {
    last_bytes: u64,
    last_elapsed: Duration,
    in_place: bool,
    no_color: bool,
    dirty: bool,
}

impl ProgressReporter {
    pub(crate) fn new(no_color: bool) -> Self {
        let in_place = std::io::stdout().is_terminal();
        Self {
            last_bytes: 0,
            last_elapsed: Duration::ZERO,
            in_place,
            no_color: no_color || !in_place,
            dirty: false,
        }
    }

    /// MB/min since the previous call.
    pub(crate) fn interval_rate(&mut self, stats: &Stats) -> f64 {
        let bytes = stats.bytes_transferred.saturating_sub(self.last_bytes);
        let span = stats.elapsed.saturating_sub(self.last_elapsed);
        self.last_bytes = stats.bytes_transferred;
        self.last_elapsed = stats.elapsed;
        rate_mb_per_min(bytes, span)
    }

    pub(crate) fn report(&mut self, stats: &Stats) -> Result<(), std::io::Error> {
        let rate = self.interval_rate(stats);
        let segments = build_progress_line(stats, rate, self.no_color);
        let mut out = std::io::stdout();
        if self.in_place {
            queue!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        }
        for segment in segments {
            if let Some(color) = segment.color {
                queue!(
                    out,
                    SetForegroundColor(color),
                    Print(&segment.text),
                    ResetColor
                )?;
            } else {
                queue!(out, Print(&segment.text))?;
            }
        }
        if self.in_place {
            self.dirty = true;
        } else {
            out.write_all(b"\n")?;
        }
        out.flush()
    }

    /// Ends an in-place line so later output starts on a fresh one.
    pub(crate) fn finish(&mut self) -> Result<(), std::io::Error> {
        if !self.dirty {
            return Ok(());
        }
        self.dirty = false;
        let mut out = std::io::stdout();
        out.write_all(b"\n")?;
        out.flush()
    }
}

pub(crate) struct ProgressSegment {
    pub(crate) text: String,
    pub(crate) color: Option<Color>,
}

impl ProgressSegment {
    const fn plain(text: String) -> Self {
        Self { text, color: None }
    }

    const fn colored(text: String, color: Color, no_color: bool) -> Self {
        Self {
            text,
            color: if no_color { None } else { Some(color) },
        }
    }
}

pub(crate) fn build_progress_line(
    stats: &Stats,
    interval_rate: f64,
    no_color: bool,
) -> Vec<ProgressSegment> {
    vec![
        ProgressSegment::plain("Data: ".to_owned()),
        ProgressSegment::colored(
            format!("{:.2} MB", bytes_to_megabytes(stats.bytes_transferred)),
            Color::Cyan,
            no_color,
        ),
        ProgressSegment::plain(" | Rate: ".to_owned()),
        ProgressSegment::colored(
            format!("{:.2} MB/min", interval_rate),
            Color::Green,
            no_color,
        ),
        ProgressSegment::plain(format!(" | Avg: {:.2} MB/min", stats.average_rate)),
        ProgressSegment::plain(" | Peak: ".to_owned()),
        ProgressSegment::colored(
            format!("{:.2} MB/min", stats.peak_rate),
            Color::Yellow,
            no_color,
        ),
        ProgressSegment::plain(format!(" | Time: {}", humanize_duration(stats.elapsed))),
    ]
}

pub(crate) fn plain_text(segments: &[ProgressSegment]) -> String {
    segments.iter().map(|segment| segment.text.as_str()).collect()
}
