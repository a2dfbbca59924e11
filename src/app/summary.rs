use crossterm::style::Stylize;

use crate::fetch::PoolReport;
use crate::metrics::Stats;

use super::export::humanize_duration;

pub(crate) fn summary_lines(stats: &Stats, report: &PoolReport) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Total data consumed: {:.2} MB ({:.2} GB)",
            stats.total_megabytes,
            stats.total_gigabytes()
        ),
        format!("Average rate: {:.2} MB/min", stats.average_rate),
        format!("Peak rate: {:.2} MB/min", stats.peak_rate),
        format!("Last rate: {:.2} MB/min", stats.current_rate),
        format!("Total runtime: {}", humanize_duration(stats.elapsed)),
    ];

    if report.sources.is_empty() {
        return lines;
    }
    let totals = report.totals();
    lines.push(format!(
        "Workers: {} | Fetches completed: {} | Failed attempts: {}",
        report.workers, totals.completed, totals.failures
    ));
    for (source, tally) in &report.sources {
        lines.push(format!(
            "  {}: {:.2} MB, {} completed, {} failed",
            source,
            crate::metrics::bytes_to_megabytes(tally.bytes),
            tally.completed,
            tally.failures
        ));
    }
    lines
}

pub(crate) fn print_summary(stats: &Stats, report: &PoolReport, no_color: bool) {
    let title = "FINAL SUMMARY";
    if no_color {
        println!("\n{}", title);
    } else {
        println!("\n{}", title.bold());
    }
    for line in summary_lines(stats, report) {
        println!("{}", line);
    }
}
