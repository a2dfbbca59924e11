use async_trait::async_trait;
use url::Url;

use crate::error::FetchError;

/// Opens a streaming download. The pool talks to sources only through this
/// seam, so tests can swap live HTTP for scripted responses.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues the request and returns once response headers arrive.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails, times out, or the response
    /// status is not a success.
    async fn open(&self, source: &Url) -> Result<Box<dyn BodyStream>, FetchError>;
}

/// A response body read chunk by chunk.
#[async_trait]
pub trait BodyStream: Send {
    /// Copies the next piece of the body into `buf` and returns its length.
    /// `Ok(0)` marks the end of the body.
    ///
    /// # Errors
    ///
    /// Returns an error when the connection breaks or stalls.
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, FetchError>;
}
