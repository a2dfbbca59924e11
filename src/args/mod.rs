//! CLI argument types and parsing helpers.
mod cli;
mod defaults;
pub(crate) mod parsers;
mod types;


pub use cli::SinkholeArgs;
pub use types::PositiveUsize;

pub(crate) use defaults::{
    BROWSER_USER_AGENT, DEFAULT_TARGET_RATE, available_cores, default_metrics_log_path,
    default_sources, default_worker_count,
};
