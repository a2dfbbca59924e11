//! The fetch worker pool: N concurrent downloaders that stream bodies from a
//! rotating list of sources, count every byte, and pace themselves against a
//! shared rate limiter.
mod client;
mod config;
mod state;
mod transport;
mod worker;


use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;

use crate::error::AppResult;
use crate::metrics::Collector;
use crate::rate::RateLimiter;
use crate::shutdown::{ShutdownSender, shutdown_channel};

pub use client::HttpTransport;
pub use config::{FetchConfig, buffer_size_for_worker};
pub use state::{AttemptResult, RetryPolicy, WorkerState};
pub use transport::{BodyStream, Transport};
pub use worker::SourceTally;

use worker::{WorkerContext, run_worker};

/// Per-source totals for a finished run, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub workers: usize,
    pub sources: Vec<(String, SourceTally)>,
}

impl PoolReport {
    #[must_use]
    pub fn totals(&self) -> SourceTally {
        let mut total = SourceTally::default();
        for (_, tally) in &self.sources {
            total.merge(tally);
        }
        total
    }

    #[must_use]
    pub fn source(&self, url: &str) -> Option<&SourceTally> {
        self.sources
            .iter()
            .find(|(source, _)| source == url)
            .map(|(_, tally)| tally)
    }
}

/// Owns the worker tasks and their shared cancellation signal.
pub struct FetchPool {
    config: FetchConfig,
    sources: Arc<[Url]>,
    transport: Arc<dyn Transport>,
    collector: Collector,
    limiter: Arc<RateLimiter>,
    shutdown_tx: ShutdownSender,
    workers: Vec<JoinHandle<Vec<SourceTally>>>,
    worker_count: usize,
    stopped: bool,
}

impl FetchPool {
    /// Validates `config` and builds the live HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns an error when the source list is empty or invalid, or the HTTP
    /// client cannot be built.
    pub fn new(config: FetchConfig, collector: Collector) -> AppResult<Self> {
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(config, collector, Arc::new(transport))
    }

    /// Same as [`FetchPool::new`] with a caller-supplied transport.
    ///
    /// # Errors
    ///
    /// Returns an error when the source list is empty or invalid.
    pub fn with_transport(
        config: FetchConfig,
        collector: Collector,
        transport: Arc<dyn Transport>,
    ) -> AppResult<Self> {
        let sources: Arc<[Url]> = config.parse_sources()?.into();
        let limiter = Arc::new(RateLimiter::new(config.target_rate_mb_per_min));
        let (shutdown_tx, _) = shutdown_channel();
        Ok(Self {
            config,
            sources,
            transport,
            collector,
            limiter,
            shutdown_tx,
            workers: Vec::new(),
            worker_count: 0,
            stopped: false,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Number of workers spawned by [`FetchPool::start`]; zero before that.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Starts the collector and spawns the workers. Returns the worker count.
    /// Calling it again while running, or after [`FetchPool::stop`], does
    /// nothing.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> usize {
        if self.stopped || !self.workers.is_empty() {
            return self.worker_count;
        }

        self.collector.start();
        let worker_count = self.config.resolve_worker_count().max(1);
        let policy = self.config.retry_policy();
        self.workers.reserve(worker_count);
        for id in 0..worker_count {
            let ctx = WorkerContext {
                id,
                sources: Arc::clone(&self.sources),
                transport: Arc::clone(&self.transport),
                collector: self.collector.clone(),
                limiter: Arc::clone(&self.limiter),
                policy,
                buffer_size: buffer_size_for_worker(id),
                verbose: self.config.verbose,
            };
            let shutdown_rx = self.shutdown_tx.subscribe();
            self.workers
                .push(tokio::spawn(run_worker(ctx, shutdown_rx)));
        }
        self.worker_count = worker_count;

        let target = if self.limiter.is_unbounded() {
            "unthrottled".to_owned()
        } else {
            format!("{} MB/min", self.config.target_rate_mb_per_min)
        };
        info!(
            "Started {} fetch workers over {} sources ({}).",
            worker_count,
            self.sources.len(),
            target
        );
        worker_count
    }

    /// Cancels every worker, waits for them to exit, then stops the
    /// collector. Safe to call more than once; later calls return an empty
    /// report.
    pub async fn stop(&mut self) -> PoolReport {
        if self.stopped {
            return PoolReport::default();
        }
        self.stopped = true;
        drop(self.shutdown_tx.send(()));

        let mut tallies = vec![SourceTally::default(); self.sources.len()];
        for handle in self.workers.drain(..) {
            match handle.await {
                Ok(worker_tallies) => {
                    for (total, tally) in tallies.iter_mut().zip(worker_tallies.iter()) {
                        total.merge(tally);
                    }
                }
                Err(err) => warn!("Fetch worker ended abnormally: {}", err),
            }
        }
        self.collector.stop().await;
        info!("Fetch workers stopped.");

        PoolReport {
            workers: self.worker_count,
            sources: self
                .sources
                .iter()
                .map(ToString::to_string)
                .zip(tallies)
                .collect(),
        }
    }
}

impl std::fmt::Debug for FetchPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchPool")
            .field("sources", &self.sources.len())
            .field("workers", &self.worker_count)
            .field("limiter", &self.limiter)
            .field("stopped", &self.stopped)
            .finish_non_exhaustive()
    }
}
