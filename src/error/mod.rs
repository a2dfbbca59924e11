mod app;
mod config;
mod fetch;
mod metrics;
mod validation;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use fetch::FetchError;
pub use metrics::MetricsError;
pub use validation::ValidationError;
