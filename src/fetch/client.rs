use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use rand::Rng;
use reqwest::Client;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tokio::time::timeout;
use tracing::error;
use url::Url;

use crate::args::BROWSER_USER_AGENT;
use crate::error::{AppError, AppResult, FetchError};

use super::config::FetchConfig;
use super::transport::{BodyStream, Transport};

const MAX_IDLE_PER_HOST: usize = 200;
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
const CACHE_BUST_PARAM: &str = "t";

/// Shared connection pool for every worker. Compression stays off so the
/// byte count matches what crossed the wire.
pub(super) fn build_client(config: &FetchConfig) -> AppResult<Client> {
    let client_builder = Client::builder()
        .connect_timeout(config.connect_timeout)
        .user_agent(BROWSER_USER_AGENT)
        .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(POOL_IDLE_TIMEOUT))
        .no_gzip()
        .no_brotli()
        .no_deflate();

    match client_builder.build() {
        Ok(client) => Ok(client),
        Err(err) => {
            error!("Failed to build HTTP client: {}", err);
            Err(AppError::fetch(FetchError::BuildClientFailed { source: err }))
        }
    }
}

/// [`Transport`] backed by `reqwest`.
pub struct HttpTransport {
    client: Client,
    randomize: bool,
    request_timeout: Duration,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(config: &FetchConfig) -> AppResult<Self> {
        Ok(Self {
            client: build_client(config)?,
            randomize: config.randomize,
            request_timeout: config.request_timeout,
        })
    }

    fn request_url(&self, source: &Url) -> Url {
        let mut url = source.clone();
        if self.randomize {
            url.query_pairs_mut()
                .append_pair(CACHE_BUST_PARAM, &cache_buster());
        }
        url
    }
}

/// Wall-clock nanoseconds plus a random suffix, so concurrent workers never
/// share a value.
pub(super) fn cache_buster() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |since| since.as_nanos());
    let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("{}{:04}", nanos, suffix)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, source: &Url) -> Result<Box<dyn BodyStream>, FetchError> {
        let request = self
            .client
            .get(self.request_url(source))
            .header(ACCEPT, "*/*")
            .header(CACHE_CONTROL, "no-cache");

        let response = match timeout(self.request_timeout, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                return Err(FetchError::Request {
                    url: source.to_string(),
                    source: err,
                });
            }
            Err(_elapsed) => {
                return Err(FetchError::ResponseTimeout {
                    url: source.to_string(),
                    timeout: self.request_timeout,
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: source.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(Box::new(HttpBody {
            url: source.to_string(),
            stream: response.bytes_stream().boxed(),
            pending: Bytes::new(),
            read_timeout: self.request_timeout,
        }))
    }
}

struct HttpBody {
    url: String,
    stream: BoxStream<'static, reqwest::Result<Bytes>>,
    /// Remainder of a network chunk larger than the caller's buffer.
    pending: Bytes,
    read_timeout: Duration,
}

#[async_trait]
impl BodyStream for HttpBody {
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, FetchError> {
        while self.pending.is_empty() {
            match timeout(self.read_timeout, self.stream.next()).await {
                Ok(Some(Ok(chunk))) => self.pending = chunk,
                Ok(Some(Err(err))) => {
                    return Err(FetchError::Body {
                        url: self.url.clone(),
                        source: err,
                    });
                }
                Ok(None) => return Ok(0),
                Err(_elapsed) => {
                    return Err(FetchError::BodyStalled {
                        url: self.url.clone(),
                        timeout: self.read_timeout,
                    });
                }
            }
        }

        let len = self.pending.len().min(buf.len());
        let head = self.pending.split_to(len);
        if let Some(dst) = buf.get_mut(..len) {
            dst.copy_from_slice(&head);
        }
        Ok(len)
    }
}
