use capture_core::error::{CaptureError, Result};
use capture_core::job::{BackendKind, Job, JobData, JobKind, JobStatus};
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Persistence for the `progressive_capture_jobs` table.
///
/// Every status transition is applied to the in-memory [`Job`] first (so
/// the monotonic-transition invariant in `capture_core::job::types` is the
/// single source of truth) and then written back with a targeted `UPDATE`,
/// mirroring the claim/start/complete/fail shape of a queue table.
#[derive(Clone)]
pub struct JobStore {
    pool: PgPool,
}

impl JobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a freshly-accepted Job in `pending` state.
    pub async fn create(&self, kind: JobKind, backend: BackendKind, data: JobData) -> Result<Job> {
        let job = Job::new(kind, backend, data);

        sqlx::query(
            r#"
            INSERT INTO progressive_capture_jobs (
                id, job_kind, repository_id, repository_name, backend, status,
                external_run_id, time_range_days, pr_numbers, max_items,
                trigger_source, metadata, last_error, created_at, started_at, completed_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16
            )
            "#,
        )
        .bind(job.id)
        .bind(job.kind.as_str())
        .bind(&job.repository_id)
        .bind(&job.repository_name)
        .bind(job.backend.as_str())
        .bind(job.status.as_str())
        .bind(&job.external_run_id)
        .bind(job.time_range_days)
        .bind(&job.pr_numbers)
        .bind(job.max_items)
        .bind(trigger_source_str(job.trigger_source))
        .bind(&job.metadata)
        .bind(&job.last_error)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| CaptureError::StoreError(e.to_string()))?;

        Ok(job)
    }

    pub async fn get(&self, id: Uuid) -> Result<Job> {
        let row = sqlx::query(
            r#"
            SELECT id, job_kind, repository_id, repository_name, backend, status,
                   external_run_id, time_range_days, pr_numbers, max_items,
                   trigger_source, metadata, last_error, created_at, started_at, completed_at
            FROM progressive_capture_jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CaptureError::StoreError(e.to_string()))?
        .ok_or_else(|| CaptureError::NotFound(format!("job {id} not found")))?;

        row_to_job(&row)
    }

    /// Transition a Job to `processing` and persist `started_at`.
    pub async fn start(&self, id: Uuid) -> Result<Job> {
        let mut job = self.get(id).await?;
        job.transition_to(JobStatus::Processing)
            .map_err(CaptureError::InvalidState)?;

        sqlx::query(
            r#"
            UPDATE progressive_capture_jobs
            SET status = $2, started_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(job.status.as_str())
        .bind(job.started_at)
        .execute(&self.pool)
        .await
        .map_err(|e| CaptureError::StoreError(e.to_string()))?;

        Ok(job)
    }

    /// Transition a Job to `completed`.
    pub async fn complete(&self, id: Uuid) -> Result<Job> {
        let mut job = self.get(id).await?;
        job.transition_to(JobStatus::Completed)
            .map_err(CaptureError::InvalidState)?;
        self.finish(id, &job).await?;
        Ok(job)
    }

    /// Transition a Job to `failed`, recording the terminal error text.
    pub async fn fail(&self, id: Uuid, error: impl Into<String>) -> Result<Job> {
        let mut job = self.get(id).await?;
        job.transition_to(JobStatus::Failed)
            .map_err(CaptureError::InvalidState)?;
        job.last_error = Some(error.into());
        self.finish(id, &job).await?;
        Ok(job)
    }

    async fn finish(&self, id: Uuid, job: &Job) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE progressive_capture_jobs
            SET status = $2, completed_at = $3, last_error = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(job.status.as_str())
        .bind(job.completed_at)
        .bind(&job.last_error)
        .execute(&self.pool)
        .await
        .map_err(|e| CaptureError::StoreError(e.to_string()))?;

        Ok(())
    }

    /// Persist the external run id returned by the batch back-end's dispatch call.
    pub async fn set_external_run_id(&self, id: Uuid, run_id: impl Into<String>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE progressive_capture_jobs
            SET external_run_id = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(run_id.into())
        .execute(&self.pool)
        .await
        .map_err(|e| CaptureError::StoreError(e.to_string()))?;

        Ok(())
    }

    /// Fraction of Jobs that finished `failed` among those that reached a
    /// terminal state within `window` — the health collaborator's input
    /// signal (spec §4.4 "Automated rollback"). `0.0` when nothing finished
    /// in the window, since an idle period is not itself a critical signal.
    pub async fn recent_error_rate(&self, window: chrono::Duration) -> Result<f64> {
        let interval = sqlx::postgres::types::PgInterval::try_from(window)
            .map_err(|e| CaptureError::StoreError(format!("invalid interval: {e}")))?;

        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'failed') AS failed,
                COUNT(*) AS total
            FROM progressive_capture_jobs
            WHERE completed_at >= NOW() - $1
            "#,
        )
        .bind(interval)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CaptureError::StoreError(e.to_string()))?;

        let failed: i64 = row.get("failed");
        let total: i64 = row.get("total");
        if total == 0 {
            return Ok(0.0);
        }
        Ok(failed as f64 / total as f64)
    }

    /// Rows stuck in `processing` past `threshold`. Exposed for an external
    /// sweeper to reap; the store and router never call this themselves
    /// (see spec's Open Question on reaping ownership).
    pub async fn stale_processing(&self, threshold: chrono::Duration) -> Result<Vec<Job>> {
        let interval = sqlx::postgres::types::PgInterval::try_from(threshold)
            .map_err(|e| CaptureError::StoreError(format!("invalid interval: {e}")))?;

        let rows = sqlx::query(
            r#"
            SELECT id, job_kind, repository_id, repository_name, backend, status,
                   external_run_id, time_range_days, pr_numbers, max_items,
                   trigger_source, metadata, last_error, created_at, started_at, completed_at
            FROM progressive_capture_jobs
            WHERE status = 'processing'
              AND started_at < NOW() - $1
            "#,
        )
        .bind(interval)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CaptureError::StoreError(e.to_string()))?;

        rows.iter().map(row_to_job).collect()
    }
}

fn trigger_source_str(source: capture_core::job::TriggerSource) -> &'static str {
    match source {
        capture_core::job::TriggerSource::Manual => "manual",
        capture_core::job::TriggerSource::Scheduled => "scheduled",
    }
}

fn row_to_job(row: &sqlx::postgres::PgRow) -> Result<Job> {
    let job_kind: String = row.get("job_kind");
    let backend: String = row.get("backend");
    let status: String = row.get("status");
    let trigger_source: String = row.get("trigger_source");

    Ok(Job {
        id: row.get("id"),
        kind: JobKind::from_str(&job_kind)
            .ok_or_else(|| CaptureError::StoreError(format!("unknown job_kind '{job_kind}'")))?,
        repository_id: row.get("repository_id"),
        repository_name: row.get("repository_name"),
        backend: BackendKind::from_str(&backend)
            .ok_or_else(|| CaptureError::StoreError(format!("unknown backend '{backend}'")))?,
        status: JobStatus::from_str(&status)
            .ok_or_else(|| CaptureError::StoreError(format!("unknown status '{status}'")))?,
        external_run_id: row.get("external_run_id"),
        time_range_days: row.get("time_range_days"),
        pr_numbers: row.get("pr_numbers"),
        max_items: row.get("max_items"),
        trigger_source: match trigger_source.as_str() {
            "scheduled" => capture_core::job::TriggerSource::Scheduled,
            _ => capture_core::job::TriggerSource::Manual,
        },
        metadata: row.get("metadata"),
        last_error: row.get("last_error"),
        created_at: row.get("created_at"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_source_round_trips() {
        assert_eq!(
            trigger_source_str(capture_core::job::TriggerSource::Manual),
            "manual"
        );
        assert_eq!(
            trigger_source_str(capture_core::job::TriggerSource::Scheduled),
            "scheduled"
        );
    }
}
