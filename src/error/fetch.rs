use std::time::Duration;

use thiserror::Error;

/// Failures of a single fetch attempt, plus client construction failures.
///
/// Everything except `BuildClientFailed` is transient: the worker loop
/// recovers by retrying or rotating to the next source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {source}")]
    BuildClientFailed {
        #[source]
        source: reqwest::Error,
    },
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("No response from {url} within {timeout:?}")]
    ResponseTimeout { url: String, timeout: Duration },
    #[error("Reading body from {url} failed: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Body of {url} stalled for {timeout:?}")]
    BodyStalled { url: String, timeout: Duration },
}

impl FetchError {
    /// Returns whether the failure came from a timer rather than the peer.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            FetchError::ResponseTimeout { .. } | FetchError::BodyStalled { .. }
        )
    }
}
