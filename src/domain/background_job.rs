//! Detached units of work produced by the request path.

use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Work the request path hands off instead of waiting on the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundJob {
    /// Add `delta` clicks to the durable counter of `short_code`.
    FlushClicks { short_code: String, delta: i64 },
    /// Hard-delete a link found expired during resolution.
    PurgeExpired { id: Uuid, short_code: String },
}

impl BackgroundJob {
    pub fn kind(&self) -> &'static str {
        match self {
            BackgroundJob::FlushClicks { .. } => "flush_clicks",
            BackgroundJob::PurgeExpired { .. } => "purge_expired",
        }
    }

    pub fn short_code(&self) -> &str {
        match self {
            BackgroundJob::FlushClicks { short_code, .. }
            | BackgroundJob::PurgeExpired { short_code, .. } => short_code,
        }
    }
}

/// Producer side of the bounded background queue.
///
/// Submission never waits. When the queue is full the job is dropped, which for a
/// click flush means up to one batch of clicks never reaches the store.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<BackgroundJob>,
}

impl JobQueue {
    /// Creates the queue and returns the receiver for
    /// [`crate::domain::background_worker::run_background_worker`].
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BackgroundJob>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Enqueues `job`. Returns `false` if it was dropped.
    pub fn submit(&self, job: BackgroundJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(job)) => {
                metrics::counter!("background_jobs_dropped_total").increment(1);
                tracing::error!(
                    kind = job.kind(),
                    short_code = job.short_code(),
                    "Background queue full, job dropped"
                );
                false
            }
            Err(TrySendError::Closed(job)) => {
                metrics::counter!("background_jobs_dropped_total").increment(1);
                tracing::error!(
                    kind = job.kind(),
                    short_code = job.short_code(),
                    "Background worker stopped, job dropped"
                );
                false
            }
        }
    }

    /// Free slots left in the queue.
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
