pub mod config;
pub mod error;
pub mod forge;
pub mod job;
pub mod observability;
pub mod rate_limit;
pub mod rollout;

// Testing utilities - available when the "testing" feature is enabled or in test mode
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{CaptureConfig, CaptureInvocation, DatabaseConfig, ForgeAuthConfig, RouterConfig};
pub use error::{CaptureError, Result};
pub use forge::{
    Author, FileChange, ForgeMetrics, ForgeReader, IssueComment, PullRequest, PullRequestComplete,
    PullRequestState, PullRequestTimestamps, RateLimitInfo, Review, ReviewComment,
};
pub use job::{
    BackendHandle, BackendKind, BackoffStrategy, Job, JobData, JobKind, JobStatus, Progress,
    ProgressError, RetryConfig, TriggerSource,
};
pub use observability::{
    Alert, AlertCondition, AlertSeverity, AlertState, AlertStatus, LogEntry, LogLevel, Metric,
    MetricKind, MetricLabels, MetricValue,
};
pub use rate_limit::{
    retry_after_for_reset, GovernorAlert, GovernorAlertSeverity, GovernorReport,
    GovernorThresholds, PredictResult, QueryTypeSummary, RateLimitSample, Recommendation,
    RecommendationPriority, MAX_GOVERNOR_ALERTS,
};
pub use rollout::{
    rollout_hash, RepositoryCategory, RolloutAction, RolloutConfiguration, RolloutHistoryEntry,
    RolloutStrategy, DEFAULT_FEATURE, TRIGGERED_BY_AUTOMATED_HEALTH_CHECK, TRIGGERED_BY_MANUAL,
};
