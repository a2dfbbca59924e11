use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_FILTER: &str = "sinkhole=info,warn";
const VERBOSE_FILTER: &str = "sinkhole=debug,info";

/// Installs the global `tracing` subscriber.
///
/// `SINKHOLE_LOG` wins over `RUST_LOG`; without either the level follows
/// `verbose`. Events go to stderr so the progress line owns stdout.
pub fn init_logging(verbose: bool, no_color: bool) {
    let fallback = if verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    };
    let filter = std::env::var("SINKHOLE_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map_or_else(
            |_| EnvFilter::new(fallback),
            |value| EnvFilter::try_new(value).unwrap_or_else(|_| EnvFilter::new(fallback)),
        );

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("Global subscriber already installed; keeping it.");
    }
}
