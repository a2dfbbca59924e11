use chrono::{DateTime, TimeZone};

/// Sent on every request; some mirrors throttle or reject non-browser agents.
pub(crate) const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Aggregate target in MB/min.
pub(crate) const DEFAULT_TARGET_RATE: i64 = 1024;

pub(crate) const DEFAULT_METRICS_FILE: &str = "sinkhole_metrics.json";

const DEFAULT_SOURCES: &[&str] = &[
    "https://speed.cloudflare.com/1000mb.bin",
    "https://ftp.arnes.si/software/ubuntu-releases/20.04/ubuntu-20.04.3-desktop-amd64.iso",
    "https://releases.ubuntu.com/20.04.4/ubuntu-20.04.4-desktop-amd64.iso",
    "https://ftp.gnu.org/gnu/gcc/gcc-11.1.0/gcc-11.1.0.tar.xz",
    "https://download.blender.org/release/Blender2.93/blender-2.93.0-linux64.tar.xz",
    "https://ftp.mozilla.org/pub/firefox/releases/90.0/linux-x86_64/en-US/firefox-90.0.tar.bz2",
    "https://ftp.gnu.org/gnu/binutils/binutils-2.36.1.tar.xz",
];

pub(crate) fn default_sources() -> Vec<String> {
    DEFAULT_SOURCES
        .iter()
        .map(|source| (*source).to_owned())
        .collect()
}

pub(crate) fn default_metrics_log_path<Tz>(started_at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("sinkhole_log_{}.csv", started_at.format("%Y%m%d_%H%M%S"))
}

/// Ceiling for the derived worker count; also used when throttling is off.
pub(crate) const MAX_AUTO_WORKERS: usize = 150;
const WORKERS_PER_CORE: usize = 4;
/// Each full multiple of this target (MB/min) scales the per-core count.
const RATE_PER_WORKER_STEP: i64 = 1024;

/// Worker count used when none is configured: four per core, scaled by how
/// many multiples of 1 GB/min the target asks for, capped at
/// [`MAX_AUTO_WORKERS`]. An unbounded target gets the cap.
pub(crate) fn default_worker_count(target_rate_mb_per_min: i64, cores: usize) -> usize {
    if target_rate_mb_per_min <= 0 {
        return MAX_AUTO_WORKERS;
    }
    let scale = target_rate_mb_per_min
        .checked_div(RATE_PER_WORKER_STEP)
        .and_then(|steps| usize::try_from(steps).ok())
        .unwrap_or(1)
        .max(1);
    cores
        .max(1)
        .saturating_mul(WORKERS_PER_CORE)
        .saturating_mul(scale)
        .min(MAX_AUTO_WORKERS)
}

pub(crate) fn available_cores() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}
