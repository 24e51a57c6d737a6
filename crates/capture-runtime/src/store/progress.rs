use capture_core::error::{CaptureError, Result};
use capture_core::job::Progress;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Persistence for the `progressive_capture_progress` table.
///
/// Each update reads the current row, mutates it through
/// `capture_core::job::Progress`'s bookkeeping methods, and writes the
/// whole row back. Progress rows are only ever touched by the worker that
/// owns the Job, so there is no cross-writer contention to guard against.
#[derive(Clone)]
pub struct ProgressStore {
    pool: PgPool,
}

impl ProgressStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the Progress row for a freshly-started Job.
    pub async fn init(&self, job_id: Uuid, total: u32) -> Result<Progress> {
        let progress = Progress::new(job_id, total);
        self.upsert(&progress).await?;
        Ok(progress)
    }

    pub async fn get(&self, job_id: Uuid) -> Result<Progress> {
        let row = sqlx::query(
            r#"
            SELECT job_id, total, processed, failed, current_item, recent_errors, consecutive_failures
            FROM progressive_capture_progress
            WHERE job_id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CaptureError::StoreError(e.to_string()))?
        .ok_or_else(|| CaptureError::NotFound(format!("progress for job {job_id} not found")))?;

        row_to_progress(&row)
    }

    /// Record a successfully processed item and persist the updated row.
    pub async fn record_success(&self, job_id: Uuid, item_id: impl Into<String>) -> Result<Progress> {
        let mut progress = self.get(job_id).await?;
        progress.record_success(item_id);
        self.upsert(&progress).await?;
        Ok(progress)
    }

    /// Record a failed item and persist the updated row.
    pub async fn record_failure(
        &self,
        job_id: Uuid,
        item_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Progress> {
        let mut progress = self.get(job_id).await?;
        progress.record_failure(item_id, message);
        self.upsert(&progress).await?;
        Ok(progress)
    }

    async fn upsert(&self, progress: &Progress) -> Result<()> {
        let recent_errors = serde_json::to_value(&progress.recent_errors)
            .map_err(|e| CaptureError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO progressive_capture_progress (
                job_id, total, processed, failed, current_item, recent_errors, consecutive_failures
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (job_id) DO UPDATE SET
                total = EXCLUDED.total,
                processed = EXCLUDED.processed,
                failed = EXCLUDED.failed,
                current_item = EXCLUDED.current_item,
                recent_errors = EXCLUDED.recent_errors,
                consecutive_failures = EXCLUDED.consecutive_failures
            "#,
        )
        .bind(progress.job_id)
        .bind(progress.total as i32)
        .bind(progress.processed as i32)
        .bind(progress.failed as i32)
        .bind(&progress.current_item)
        .bind(recent_errors)
        .bind(progress.consecutive_failures as i32)
        .execute(&self.pool)
        .await
        .map_err(|e| CaptureError::StoreError(e.to_string()))?;

        Ok(())
    }
}

fn row_to_progress(row: &sqlx::postgres::PgRow) -> Result<Progress> {
    let recent_errors: serde_json::Value = row.get("recent_errors");
    let recent_errors = serde_json::from_value(recent_errors)
        .map_err(|e| CaptureError::Serialization(e.to_string()))?;

    Ok(Progress {
        job_id: row.get("job_id"),
        total: row.get::<i32, _>("total") as u32,
        processed: row.get::<i32, _>("processed") as u32,
        failed: row.get::<i32, _>("failed") as u32,
        current_item: row.get("current_item"),
        recent_errors,
        consecutive_failures: row.get::<i32, _>("consecutive_failures") as u32,
    })
}
