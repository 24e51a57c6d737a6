use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of capture work a Job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    Details,
    Reviews,
    Comments,
    HistoricalSync,
    FileChanges,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Details => "details",
            Self::Reviews => "reviews",
            Self::Comments => "comments",
            Self::HistoricalSync => "historical-sync",
            Self::FileChanges => "file-changes",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "details" => Some(Self::Details),
            "reviews" => Some(Self::Reviews),
            "comments" => Some(Self::Comments),
            "historical-sync" => Some(Self::HistoricalSync),
            "file-changes" => Some(Self::FileChanges),
            _ => None,
        }
    }
}

/// The back-end a Job was routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    LowLatency,
    Batch,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowLatency => "lowlatency",
            Self::Batch => "batch",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "lowlatency" => Some(Self::LowLatency),
            "batch" => Some(Self::Batch),
            _ => None,
        }
    }
}

/// How a capture request entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Manual,
    Scheduled,
}

/// Status of a Job. Transitions monotonically:
/// `pending -> processing -> (completed | failed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Whether self -> next is a legal monotonic transition.
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Input to the Router's `enqueue` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobData {
    pub repository_id: String,
    pub repository_name: String,
    #[serde(default)]
    pub pr_numbers: Option<Vec<i64>>,
    #[serde(default)]
    pub time_range_days: Option<i32>,
    #[serde(default)]
    pub max_items: Option<i32>,
    pub trigger_source: TriggerSource,
}

/// A unit of work created by the Router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub kind: JobKind,
    pub repository_id: String,
    pub repository_name: String,
    pub backend: BackendKind,
    pub status: JobStatus,
    pub external_run_id: Option<String>,
    pub time_range_days: Option<i32>,
    pub pr_numbers: Option<Vec<i64>>,
    pub max_items: Option<i32>,
    pub trigger_source: TriggerSource,
    pub metadata: serde_json::Value,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Construct a freshly-accepted Job in `pending` state.
    pub fn new(kind: JobKind, backend: BackendKind, data: JobData) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            repository_id: data.repository_id,
            repository_name: data.repository_name,
            backend,
            status: JobStatus::Pending,
            external_run_id: None,
            time_range_days: data.time_range_days,
            pr_numbers: data.pr_numbers,
            max_items: data.max_items,
            trigger_source: data.trigger_source,
            metadata: serde_json::Value::Null,
            last_error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Apply a status transition, stamping the appropriate timestamp.
    /// Returns an error message (not `CaptureError`, to keep this module
    /// free of the error crate's validation context) if the transition
    /// is not monotonic.
    pub fn transition_to(&mut self, next: JobStatus) -> Result<(), String> {
        if !self.status.can_transition_to(next) {
            return Err(format!(
                "illegal transition {} -> {}",
                self.status.as_str(),
                next.as_str()
            ));
        }
        let now = Utc::now();
        match next {
            JobStatus::Processing => self.started_at = Some(now),
            JobStatus::Completed | JobStatus::Failed => self.completed_at = Some(now),
            JobStatus::Pending => {}
        }
        self.status = next;
        Ok(())
    }
}

/// A recorded item-level failure within a Job's Progress row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressError {
    pub item_id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Maximum number of recent errors retained per Progress row.
pub const MAX_RECENT_ERRORS: usize = 20;

/// One row per Job recording item-level progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub job_id: Uuid,
    pub total: u32,
    pub processed: u32,
    pub failed: u32,
    pub current_item: Option<String>,
    pub recent_errors: Vec<ProgressError>,
    /// Failures since the last success; reset to 0 on `record_success`.
    /// Drives the ≥10 consecutive-failure job-abort rule in spec §7.
    #[serde(default)]
    pub consecutive_failures: u32,
}

impl Progress {
    pub fn new(job_id: Uuid, total: u32) -> Self {
        Self {
            job_id,
            total,
            processed: 0,
            failed: 0,
            current_item: None,
            recent_errors: Vec::new(),
            consecutive_failures: 0,
        }
    }

    /// Record a successfully processed item.
    pub fn record_success(&mut self, item_id: impl Into<String>) {
        self.processed += 1;
        self.current_item = Some(item_id.into());
        self.consecutive_failures = 0;
    }

    /// Record a failed item, bounding the recent-errors list.
    pub fn record_failure(&mut self, item_id: impl Into<String>, message: impl Into<String>) {
        self.failed += 1;
        self.consecutive_failures += 1;
        let item_id = item_id.into();
        self.current_item = Some(item_id.clone());
        self.recent_errors.push(ProgressError {
            item_id,
            message: message.into(),
            timestamp: Utc::now(),
        });
        if self.recent_errors.len() > MAX_RECENT_ERRORS {
            let overflow = self.recent_errors.len() - MAX_RECENT_ERRORS;
            self.recent_errors.drain(0..overflow);
        }
    }

    /// Whether this Job should abort per the ≥10 consecutive-failure rule.
    pub fn consecutive_failures_exceeded(&self) -> bool {
        self.consecutive_failures >= 10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_kind_round_trips() {
        for kind in [
            JobKind::Details,
            JobKind::Reviews,
            JobKind::Comments,
            JobKind::HistoricalSync,
            JobKind::FileChanges,
        ] {
            assert_eq!(JobKind::from_str(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn status_transitions_are_monotonic() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Processing));
    }

    #[test]
    fn job_transition_stamps_timestamps() {
        let data = JobData {
            repository_id: "r1".into(),
            repository_name: "acme/repo".into(),
            pr_numbers: Some(vec![42]),
            time_range_days: None,
            max_items: None,
            trigger_source: TriggerSource::Manual,
        };
        let mut job = Job::new(JobKind::Details, BackendKind::LowLatency, data);
        assert!(job.started_at.is_none());
        job.transition_to(JobStatus::Processing).unwrap();
        assert!(job.started_at.is_some());
        assert!(job.completed_at.is_none());
        job.transition_to(JobStatus::Completed).unwrap();
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn job_rejects_illegal_transition() {
        let data = JobData {
            repository_id: "r1".into(),
            repository_name: "acme/repo".into(),
            pr_numbers: None,
            time_range_days: Some(180),
            max_items: Some(1000),
            trigger_source: TriggerSource::Scheduled,
        };
        let mut job = Job::new(JobKind::HistoricalSync, BackendKind::Batch, data);
        assert!(job.transition_to(JobStatus::Completed).is_err());
    }

    #[test]
    fn progress_counts_never_exceed_total() {
        let job_id = Uuid::new_v4();
        let mut progress = Progress::new(job_id, 3);
        progress.record_success("pr-1");
        progress.record_failure("pr-2", "boom");
        progress.record_success("pr-3");
        assert_eq!(progress.processed, 2);
        assert_eq!(progress.failed, 1);
        assert!(progress.processed + progress.failed <= progress.total);
    }

    #[test]
    fn progress_bounds_recent_errors() {
        let mut progress = Progress::new(Uuid::new_v4(), 100);
        for i in 0..(MAX_RECENT_ERRORS + 5) {
            progress.record_failure(format!("item-{i}"), "err");
        }
        assert_eq!(progress.recent_errors.len(), MAX_RECENT_ERRORS);
    }
}
