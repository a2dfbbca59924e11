use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

use crate::error::FetchError;
use crate::metrics::Collector;
use crate::rate::RateLimiter;
use crate::shutdown::{ShutdownReceiver, shutdown_requested};

use super::state::{AttemptResult, RetryPolicy, WorkerState};
use super::transport::Transport;

/// Per-source counters kept by one worker and merged by the pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceTally {
    pub attempts: u64,
    pub failures: u64,
    pub completed: u64,
    pub bytes: u64,
}

impl SourceTally {
    pub(super) fn merge(&mut self, other: &SourceTally) {
        self.attempts = self.attempts.saturating_add(other.attempts);
        self.failures = self.failures.saturating_add(other.failures);
        self.completed = self.completed.saturating_add(other.completed);
        self.bytes = self.bytes.saturating_add(other.bytes);
    }
}

pub(super) struct WorkerContext {
    pub(super) id: usize,
    pub(super) sources: Arc<[Url]>,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) collector: Collector,
    pub(super) limiter: Arc<RateLimiter>,
    pub(super) policy: RetryPolicy,
    pub(super) buffer_size: usize,
    pub(super) verbose: bool,
}

enum AttemptOutcome {
    Completed { bytes: u64 },
    Failed { bytes: u64, error: FetchError },
    Cancelled { bytes: u64 },
}

impl AttemptOutcome {
    const fn result(&self) -> AttemptResult {
        match self {
            AttemptOutcome::Completed { .. } => AttemptResult::Completed,
            AttemptOutcome::Failed { .. } => AttemptResult::Failed,
            AttemptOutcome::Cancelled { .. } => AttemptResult::Cancelled,
        }
    }

    const fn bytes(&self) -> u64 {
        match self {
            AttemptOutcome::Completed { bytes }
            | AttemptOutcome::Failed { bytes, .. }
            | AttemptOutcome::Cancelled { bytes } => *bytes,
        }
    }
}

/// Runs until shutdown, cycling through sources. Never returns an error:
/// every fetch failure is handled by retrying or rotating.
pub(super) async fn run_worker(
    ctx: WorkerContext,
    mut shutdown_rx: ShutdownReceiver,
) -> Vec<SourceTally> {
    let source_count = ctx.sources.len();
    let mut tallies = vec![SourceTally::default(); source_count];
    let mut buffer = vec![0u8; ctx.buffer_size.max(1)];
    let mut state = WorkerState::initial(ctx.id, source_count);
    debug!(
        "Worker {} started with a {} byte buffer.",
        ctx.id, ctx.buffer_size
    );

    while !state.is_cancelled() {
        let WorkerState::Fetching { source, attempt } = state else {
            state = state.rotate(source_count);
            continue;
        };
        if shutdown_requested(&mut shutdown_rx) {
            state = WorkerState::Cancelled;
            continue;
        }
        let Some(url) = ctx.sources.get(source) else {
            state = WorkerState::Rotating { from: source };
            continue;
        };

        let outcome = fetch_once(&ctx, url, &mut buffer, &mut shutdown_rx).await;
        let next = state.after_attempt(outcome.result(), &ctx.policy);

        if let Some(tally) = tallies.get_mut(source) {
            tally.bytes = tally.bytes.saturating_add(outcome.bytes());
            if !matches!(outcome, AttemptOutcome::Cancelled { .. }) {
                tally.attempts = tally.attempts.saturating_add(1);
            }
            match outcome.result() {
                AttemptResult::Completed => {
                    tally.completed = tally.completed.saturating_add(1);
                }
                AttemptResult::Failed => {
                    tally.failures = tally.failures.saturating_add(1);
                }
                AttemptResult::Cancelled => {}
            }
        }

        state = match outcome {
            AttemptOutcome::Failed { error, .. } => {
                if ctx.verbose {
                    log_failure(ctx.id, url, attempt, &error, next);
                }
                if backoff(&ctx.policy, &mut shutdown_rx).await {
                    next
                } else {
                    WorkerState::Cancelled
                }
            }
            AttemptOutcome::Completed { bytes } => {
                debug!("Worker {} finished {} ({} bytes).", ctx.id, url, bytes);
                next
            }
            AttemptOutcome::Cancelled { .. } => next,
        };
        tokio::task::yield_now().await;
    }

    debug!("Worker {} stopped.", ctx.id);
    tallies
}

fn log_failure(worker: usize, url: &Url, attempt: usize, error: &FetchError, next: WorkerState) {
    let outcome = if error.is_timeout() {
        "timed out"
    } else {
        "failed"
    };
    match next {
        WorkerState::Fetching { attempt: retry, .. } => {
            warn!(
                "Worker {}: attempt {} on {} {}: {}. Retrying (attempt {}).",
                worker, attempt, url, outcome, error, retry
            );
        }
        WorkerState::Rotating { .. } | WorkerState::Cancelled => {
            warn!(
                "Worker {}: attempt {} on {} {}: {}. Giving up on this source.",
                worker, attempt, url, outcome, error
            );
        }
    }
}

/// Sleeps the retry pause. Returns `false` when shutdown cut it short.
async fn backoff(policy: &RetryPolicy, shutdown_rx: &mut ShutdownReceiver) -> bool {
    if policy.backoff.is_zero() {
        return true;
    }
    tokio::select! {
        _ = shutdown_rx.recv() => false,
        () = sleep(policy.backoff) => true,
    }
}

/// One streaming download. Every await races the shutdown signal.
async fn fetch_once(
    ctx: &WorkerContext,
    url: &Url,
    buffer: &mut [u8],
    shutdown_rx: &mut ShutdownReceiver,
) -> AttemptOutcome {
    let opened = tokio::select! {
        _ = shutdown_rx.recv() => return AttemptOutcome::Cancelled { bytes: 0 },
        opened = ctx.transport.open(url) => opened,
    };
    let mut body = match opened {
        Ok(body) => body,
        Err(error) => return AttemptOutcome::Failed { bytes: 0, error },
    };

    let mut received: u64 = 0;
    loop {
        let read = tokio::select! {
            _ = shutdown_rx.recv() => return AttemptOutcome::Cancelled { bytes: received },
            read = body.read_chunk(buffer) => read,
        };
        let len = match read {
            Ok(0) => return AttemptOutcome::Completed { bytes: received },
            Ok(len) => u64::try_from(len).unwrap_or(u64::MAX),
            Err(error) => {
                return AttemptOutcome::Failed {
                    bytes: received,
                    error,
                };
            }
        };

        ctx.collector.add_bytes(len);
        received = received.saturating_add(len);

        let wait = ctx.limiter.decide(len);
        if !wait.is_zero() {
            tokio::select! {
                _ = shutdown_rx.recv() => return AttemptOutcome::Cancelled { bytes: received },
                () = sleep(wait) => {}
            }
        }
    }
}
