mod comments;
mod details;
mod file_changes;
mod historical_sync;
mod reviews;

pub use comments::CommentsWorker;
pub use details::DetailsWorker;
pub use file_changes::FileChangesWorker;
pub use historical_sync::HistoricalSyncWorker;
pub use reviews::ReviewsWorker;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use capture_core::error::{CaptureError, Result};
use capture_core::forge::ForgeReader;
use capture_core::job::{Job, JobKind, RetryConfig};
use uuid::Uuid;

use crate::store::{CaptureStore, ProgressStore};

/// One capture operation bound to a `JobKind` (spec §5: "Capture Workers,
/// one per JobKind"). `run` drives a whole Job to completion against the
/// Progress row it owns, applying the item-level error policy in §7
/// through [`WorkerContext::process_item`].
pub trait CaptureWorker: Send + Sync {
    fn kind(&self) -> JobKind;

    fn run<'a>(
        &'a self,
        ctx: &'a WorkerContext,
        job: &'a Job,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Dependencies shared by every Capture Worker: a forge read path (the
/// hybrid client or either of its backends), the two stores a worker
/// writes through, and the retry policy for item-level Transport failures.
#[derive(Clone)]
pub struct WorkerContext {
    pub forge: Arc<dyn ForgeReader>,
    pub capture_store: CaptureStore,
    pub progress_store: ProgressStore,
    pub retry: RetryConfig,
    cancel: Arc<AtomicBool>,
}

impl WorkerContext {
    pub fn new(
        forge: Arc<dyn ForgeReader>,
        capture_store: CaptureStore,
        progress_store: ProgressStore,
        retry: RetryConfig,
    ) -> Self {
        Self {
            forge,
            capture_store,
            progress_store,
            retry,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Bind this context to a fresh per-job cancellation flag (spec §4.1:
    /// a low-latency Job MAY be cancelled by its pool). The pool holds the
    /// other half of the `Arc` and flips it from [`super::lowlatency`].
    pub fn with_cancel_flag(&self, cancel: Arc<AtomicBool>) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    /// Whether the pool has requested cancellation of this Job. Checked
    /// between items, never mid-item, so an in-flight upsert always
    /// completes (spec §4.1: "finishes the current item ... to preserve
    /// row integrity").
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Apply the item-level error policy from spec §7 around one
    /// forge-then-store operation: `NotFound` records and moves on;
    /// `RateExhausted` sleeps until reset (capped at 60s) and retries once;
    /// `Transport` retries up to `retry.max_attempts` with exponential
    /// backoff; anything left over is recorded as a failure, aborting the
    /// Job only once ten consecutive items have failed.
    /// `InvalidArgument`/`EmergencyStopped`/`BackendUnavailable` are never
    /// produced by item-level calls and pass straight through.
    pub async fn process_item<F, Fut>(&self, job_id: Uuid, item_id: &str, mut call: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut attempt = 0u32;
        loop {
            match call().await {
                Ok(()) => {
                    self.progress_store.record_success(job_id, item_id).await?;
                    return Ok(());
                }
                Err(CaptureError::NotFound(msg)) => {
                    self.progress_store.record_failure(job_id, item_id, msg).await?;
                    return Ok(());
                }
                Err(CaptureError::RateExhausted { retry_after, .. }) if attempt == 0 => {
                    attempt += 1;
                    let wait = retry_after.min(Duration::from_secs(60));
                    tracing::warn!(item_id, wait_secs = wait.as_secs(), "rate exhausted, sleeping before single retry");
                    tokio::time::sleep(wait).await;
                }
                Err(CaptureError::Transport(msg)) if attempt < self.retry.max_attempts => {
                    attempt += 1;
                    let backoff = self.retry.calculate_backoff(attempt);
                    tracing::warn!(item_id, attempt, backoff_secs = backoff.as_secs(), error = %msg, "transport error, retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(e @ (CaptureError::Transport(_) | CaptureError::RateExhausted { .. } | CaptureError::StoreError(_))) => {
                    let progress = self
                        .progress_store
                        .record_failure(job_id, item_id, e.to_string())
                        .await?;
                    if progress.consecutive_failures_exceeded() {
                        return Err(CaptureError::InvalidState(format!(
                            "job {job_id} aborted: {} consecutive item failures",
                            progress.consecutive_failures
                        )));
                    }
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Checked at the top of every worker's item loop, never mid-item.
pub(crate) fn check_cancelled(ctx: &WorkerContext) -> Result<()> {
    if ctx.is_cancelled() {
        return Err(CaptureError::InvalidState("cancelled".into()));
    }
    Ok(())
}

/// Split a `owner/repo`-shaped repository name into its two halves.
pub(crate) fn split_repository_name(repository_name: &str) -> Result<(&str, &str)> {
    repository_name
        .split_once('/')
        .ok_or_else(|| CaptureError::InvalidArgument(format!("repository name '{repository_name}' is not owner/repo")))
}
