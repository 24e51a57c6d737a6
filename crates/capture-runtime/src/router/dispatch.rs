use std::sync::Arc;

use capture_core::error::{CaptureError, Result};
use capture_core::job::{BackendHandle, BackendKind, Job, JobData, JobKind};
use capture_core::rollout::RepositoryCategory;
use uuid::Uuid;

use crate::rollout::RolloutController;
use crate::store::JobStore;

use super::classifier::classify;

/// Entry point for the hybrid router (spec §4.1: `enqueue(jobKind, JobData)`).
///
/// Classification and the rollout gate are independent concerns: `classify`
/// decides which back-end a request would use if hybrid routing is active at
/// all; the gate decides whether it is. A repository the gate excludes is not
/// an error case on its own — it is forced onto the low-latency back-end,
/// which is always available to every caller regardless of rollout state.
/// `RolloutGated` is reserved for the narrower failure where that forced
/// fallback is itself refused.
pub struct Router {
    rollout: RolloutController,
    feature: String,
    job_store: JobStore,
    lowlatency: Arc<dyn BackendHandle>,
    batch: Arc<dyn BackendHandle>,
}

impl Router {
    pub fn new(
        rollout: RolloutController,
        feature: impl Into<String>,
        job_store: JobStore,
        lowlatency: Arc<dyn BackendHandle>,
        batch: Arc<dyn BackendHandle>,
    ) -> Self {
        Self {
            rollout,
            feature: feature.into(),
            job_store,
            lowlatency,
            batch,
        }
    }

    /// `repository_category` is an input the Rollout Controller's
    /// `RepositorySize` strategy needs but `JobData` doesn't carry; the
    /// caller (the CLI or whatever triggers capture) supplies it alongside
    /// the job request.
    pub async fn enqueue(
        &self,
        kind: JobKind,
        data: JobData,
        repository_category: RepositoryCategory,
    ) -> Result<Job> {
        if data.repository_id.trim().is_empty() || data.repository_name.trim().is_empty() {
            return Err(CaptureError::InvalidArgument(
                "repository reference is required".into(),
            ));
        }

        let allowed = self
            .rollout
            .is_allowed(&self.feature, &data.repository_id, repository_category)
            .await?;

        if !allowed {
            return self.lowlatency.enqueue(kind, data).await.map_err(|e| match e {
                CaptureError::BackendUnavailable(msg) => CaptureError::RolloutGated(format!(
                    "repository excluded from hybrid routing and the low-latency fallback was refused: {msg}"
                )),
                other => other,
            });
        }

        match classify(&data) {
            BackendKind::LowLatency => self.lowlatency.enqueue(kind, data).await,
            BackendKind::Batch => self.batch.enqueue(kind, data).await,
        }
    }

    pub async fn cancel(&self, job_id: Uuid) -> Result<()> {
        let job = self.job_store.get(job_id).await?;
        match job.backend {
            BackendKind::LowLatency => self.lowlatency.cancel(job_id).await,
            BackendKind::Batch => self.batch.cancel(job_id).await,
        }
    }
}
