use std::time::Duration;

/// How a worker reacts to a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per source before rotating, at least 1.
    pub max_attempts: usize,
    /// Pause after every failed attempt.
    pub backoff: Duration,
}

/// Result of one attempt against a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptResult {
    /// Body streamed to the end.
    Completed,
    Failed,
    Cancelled,
}

/// Per-worker position in the retry/rotate cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Fetching { source: usize, attempt: usize },
    Rotating { from: usize },
    Cancelled,
}

impl WorkerState {
    /// Workers fan out across sources: worker `n` starts on `n % source_count`.
    #[must_use]
    pub fn initial(worker_id: usize, source_count: usize) -> Self {
        WorkerState::Fetching {
            source: worker_id.checked_rem(source_count).unwrap_or(0),
            attempt: 1,
        }
    }

    /// Success and exhausted retries both rotate; other failures retry in place.
    #[must_use]
    pub fn after_attempt(self, result: AttemptResult, policy: &RetryPolicy) -> Self {
        let WorkerState::Fetching { source, attempt } = self else {
            return self;
        };
        match result {
            AttemptResult::Cancelled => WorkerState::Cancelled,
            AttemptResult::Completed => WorkerState::Rotating { from: source },
            AttemptResult::Failed if attempt < policy.max_attempts => WorkerState::Fetching {
                source,
                attempt: attempt.saturating_add(1),
            },
            AttemptResult::Failed => WorkerState::Rotating { from: source },
        }
    }

    /// Moves to the next source round-robin with a fresh attempt count.
    #[must_use]
    pub fn rotate(self, source_count: usize) -> Self {
        match self {
            WorkerState::Rotating { from } => WorkerState::Fetching {
                source: from
                    .saturating_add(1)
                    .checked_rem(source_count)
                    .unwrap_or(0),
                attempt: 1,
            },
            WorkerState::Fetching { .. } | WorkerState::Cancelled => self,
        }
    }

    #[must_use]
    pub const fn is_cancelled(self) -> bool {
        matches!(self, WorkerState::Cancelled)
    }
}
