use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::error::Result;

use super::types::{Job, JobData, JobKind};

/// Capability set for a Router back-end: `{enqueue, cancel}` per the
/// back-end-selection design note. The low-latency worker pool and the
/// batch job-runner are two concrete implementations; the Router only
/// ever talks to this trait.
pub trait BackendHandle: Send + Sync {
    /// Accept a classified job for dispatch. Returns the created Job row
    /// (already transitioned as far as acceptance allows).
    fn enqueue<'a>(
        &'a self,
        kind: JobKind,
        data: JobData,
    ) -> Pin<Box<dyn Future<Output = Result<Job>> + Send + 'a>>;

    /// Request cancellation of an in-flight Job. Best-effort: a worker
    /// finishes its current item before honoring cancellation.
    fn cancel<'a>(
        &'a self,
        job_id: uuid::Uuid,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Retry configuration for item-level Transport failures (spec §7: up to
/// 2 retries, exponential back-off 1s/4s).
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_attempts: u32,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: BackoffStrategy::Exponential,
            max_backoff: Duration::from_secs(4),
        }
    }
}

impl RetryConfig {
    /// Calculate backoff duration for a given attempt (1-based).
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let base = Duration::from_secs(1);
        let backoff = match self.backoff {
            BackoffStrategy::Fixed => base,
            BackoffStrategy::Linear => base * attempt,
            BackoffStrategy::Exponential => base * 4u32.pow(attempt.saturating_sub(1)),
        };
        backoff.min(self.max_backoff)
    }
}

/// Backoff strategy for retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Same delay each time.
    Fixed,
    /// Delay increases linearly.
    Linear,
    /// Delay quadruples each time (1s, 4s per spec §7).
    Exponential,
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retry_matches_transport_policy() {
        let config = RetryConfig::default();
        assert_eq!(config.calculate_backoff(1), Duration::from_secs(1));
        assert_eq!(config.calculate_backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn backoff_is_capped() {
        let config = RetryConfig {
            max_backoff: Duration::from_secs(2),
            ..Default::default()
        };
        assert_eq!(config.calculate_backoff(2), Duration::from_secs(2));
    }
}
