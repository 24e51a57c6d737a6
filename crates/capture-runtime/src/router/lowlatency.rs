use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use capture_core::error::{CaptureError, Result};
use capture_core::job::{BackendHandle, BackendKind, Job, JobData, JobKind, JobStatus};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::store::{JobStore, ProgressStore};
use crate::workers::{
    CaptureWorker, CommentsWorker, DetailsWorker, FileChangesWorker, HistoricalSyncWorker,
    ReviewsWorker, WorkerContext,
};

const RETRY_WAIT: Duration = Duration::from_millis(500);

/// Low-latency back-end: a `tokio::sync::Semaphore`-gated worker pool,
/// grounded on the teacher's `jobs::worker::Worker` (`WorkerConfig`,
/// `max_concurrent`, per-job `tokio::spawn`). Accepting a Job means
/// acquiring a permit immediately; a pool at capacity is the "back-end
/// refusal" spec §4.1 describes, retried once after a short wait before
/// surfacing `BackendUnavailable`.
pub struct LowLatencyBackend {
    job_store: JobStore,
    progress_store: ProgressStore,
    worker_ctx: WorkerContext,
    workers: HashMap<JobKind, Arc<dyn CaptureWorker>>,
    semaphore: Arc<Semaphore>,
    item_cap: usize,
    cancellations: Arc<Mutex<HashMap<Uuid, Arc<AtomicBool>>>>,
}

impl LowLatencyBackend {
    pub fn new(
        job_store: JobStore,
        progress_store: ProgressStore,
        worker_ctx: WorkerContext,
        max_concurrent: usize,
        item_cap: usize,
    ) -> Self {
        let mut workers: HashMap<JobKind, Arc<dyn CaptureWorker>> = HashMap::new();
        workers.insert(JobKind::Details, Arc::new(DetailsWorker));
        workers.insert(JobKind::Reviews, Arc::new(ReviewsWorker));
        workers.insert(JobKind::Comments, Arc::new(CommentsWorker));
        workers.insert(JobKind::HistoricalSync, Arc::new(HistoricalSyncWorker));
        workers.insert(JobKind::FileChanges, Arc::new(FileChangesWorker));

        Self {
            job_store,
            progress_store,
            worker_ctx,
            workers,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            item_cap,
            cancellations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Enforce the per-job item cap (spec §4.1: "≤ 50") before the Job
    /// row is ever written, so the stored row reflects what will actually
    /// run.
    fn apply_item_cap(&self, data: &mut JobData) {
        if let Some(prs) = &mut data.pr_numbers {
            if prs.len() > self.item_cap {
                tracing::warn!(
                    original_len = prs.len(),
                    cap = self.item_cap,
                    "truncating pr_numbers to low-latency item cap"
                );
                prs.truncate(self.item_cap);
            }
        }
        let capped = data
            .max_items
            .map(|m| m.min(self.item_cap as i32))
            .unwrap_or(self.item_cap as i32);
        data.max_items = Some(capped);
    }

    async fn try_acquire(&self) -> Option<tokio::sync::OwnedSemaphorePermit> {
        self.semaphore.clone().try_acquire_owned().ok()
    }
}

impl BackendHandle for LowLatencyBackend {
    fn enqueue<'a>(
        &'a self,
        kind: JobKind,
        data: JobData,
    ) -> Pin<Box<dyn Future<Output = Result<Job>> + Send + 'a>> {
        Box::pin(async move {
            let mut data = data;
            self.apply_item_cap(&mut data);

            let permit = match self.try_acquire().await {
                Some(permit) => permit,
                None => {
                    tracing::warn!("low-latency pool at capacity, retrying once");
                    tokio::time::sleep(RETRY_WAIT).await;
                    self.try_acquire().await.ok_or_else(|| {
                        CaptureError::BackendUnavailable("low-latency pool at capacity".into())
                    })?
                }
            };

            let worker = self.workers.get(&kind).cloned().ok_or_else(|| {
                CaptureError::InvalidArgument(format!("no low-latency worker for {kind:?}"))
            })?;

            let job = self.job_store.create(kind, BackendKind::LowLatency, data).await?;

            let cancel_flag = Arc::new(AtomicBool::new(false));
            self.cancellations.lock().unwrap().insert(job.id, cancel_flag.clone());

            let job_store = self.job_store.clone();
            let progress_store = self.progress_store.clone();
            let ctx = self.worker_ctx.with_cancel_flag(cancel_flag);
            let cancellations = self.cancellations.clone();
            let mut running_job = job.clone();

            tokio::spawn(async move {
                let _permit = permit;

                if let Err(e) = job_store.start(running_job.id).await {
                    tracing::error!(job_id = %running_job.id, error = %e, "failed to mark job processing");
                    cancellations.lock().unwrap().remove(&running_job.id);
                    return;
                }
                running_job.status = JobStatus::Processing;

                let total = running_job.pr_numbers.as_ref().map(|v| v.len() as u32).unwrap_or(0);
                if let Err(e) = progress_store.init(running_job.id, total).await {
                    tracing::error!(job_id = %running_job.id, error = %e, "failed to init progress");
                    cancellations.lock().unwrap().remove(&running_job.id);
                    return;
                }

                let result = worker.run(&ctx, &running_job).await;
                let outcome = match result {
                    Ok(()) => job_store.complete(running_job.id).await,
                    Err(e) => job_store.fail(running_job.id, e.to_string()).await,
                };
                if let Err(e) = outcome {
                    tracing::error!(job_id = %running_job.id, error = %e, "failed to finalize job status");
                }

                cancellations.lock().unwrap().remove(&running_job.id);
            });

            Ok(job)
        })
    }

    /// Best-effort: flips a flag the running worker checks between items
    /// (spec §4.1: "finishes the current item ... then transitions to
    /// failed with reason cancelled").
    fn cancel<'a>(&'a self, job_id: Uuid) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let flag = self.cancellations.lock().unwrap().get(&job_id).cloned();
            match flag {
                Some(flag) => {
                    flag.store(true, Ordering::Relaxed);
                    Ok(())
                }
                None => Err(CaptureError::NotFound(format!("no active low-latency job {job_id}"))),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;

    use super::*;
    use capture_core::forge::{IssueComment, PullRequest, PullRequestComplete, Review, ReviewComment};
    use capture_core::job::TriggerSource;

    struct UnusedForgeReader;

    impl capture_core::forge::ForgeReader for UnusedForgeReader {
        fn get_pr_complete_data<'a>(
            &'a self,
            _owner: &'a str,
            _repo: &'a str,
            _pr_number: i64,
        ) -> Pin<Box<dyn Future<Output = Result<PullRequestComplete>> + Send + 'a>> {
            Box::pin(async { unreachable!("not exercised by this unit test") })
        }

        fn get_pr_reviews<'a>(
            &'a self,
            _owner: &'a str,
            _repo: &'a str,
            _pr_number: i64,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<Review>>> + Send + 'a>> {
            Box::pin(async { unreachable!("not exercised by this unit test") })
        }

        fn get_pr_comments<'a>(
            &'a self,
            _owner: &'a str,
            _repo: &'a str,
            _pr_number: i64,
        ) -> Pin<Box<dyn Future<Output = Result<(Vec<IssueComment>, Vec<ReviewComment>)>> + Send + 'a>>
        {
            Box::pin(async { unreachable!("not exercised by this unit test") })
        }

        fn get_recent_prs<'a>(
            &'a self,
            _owner: &'a str,
            _repo: &'a str,
            _since: chrono::DateTime<chrono::Utc>,
            _limit: u32,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<PullRequest>>> + Send + 'a>> {
            Box::pin(async { unreachable!("not exercised by this unit test") })
        }
    }

    fn lazy_pool() -> sqlx::PgPool {
        sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy("postgres://localhost/nonexistent")
            .expect("failed to create lazy pool")
    }

    fn backend(item_cap: usize) -> LowLatencyBackend {
        LowLatencyBackend::new(
            JobStore::new(lazy_pool()),
            ProgressStore::new(lazy_pool()),
            WorkerContext::new(
                Arc::new(UnusedForgeReader),
                crate::store::CaptureStore::new(lazy_pool()),
                ProgressStore::new(lazy_pool()),
                capture_core::job::RetryConfig::default(),
            ),
            4,
            item_cap,
        )
    }

    fn job_data() -> JobData {
        JobData {
            repository_id: "r1".into(),
            repository_name: "acme/repo".into(),
            pr_numbers: Some((1..=20).collect()),
            time_range_days: None,
            max_items: None,
            trigger_source: TriggerSource::Manual,
        }
    }

    #[test]
    fn item_cap_truncates_an_oversized_pr_list() {
        let backend = backend(5);
        let mut data = job_data();
        backend.apply_item_cap(&mut data);
        assert_eq!(data.pr_numbers.unwrap().len(), 5);
        assert_eq!(data.max_items, Some(5));
    }

    #[test]
    fn item_cap_leaves_a_smaller_max_items_alone() {
        let backend = backend(50);
        let mut data = job_data();
        data.max_items = Some(10);
        backend.apply_item_cap(&mut data);
        assert_eq!(data.pr_numbers.unwrap().len(), 20);
        assert_eq!(data.max_items, Some(10));
    }
}
