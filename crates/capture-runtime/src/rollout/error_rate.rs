use std::sync::Arc;
use std::sync::RwLock;
use std::time::Duration as StdDuration;

use capture_core::error::Result;
use chrono::Duration as ChronoDuration;

use super::health::ErrorRateSource;
use crate::store::JobStore;

/// Bridges `JobStore::recent_error_rate` (async, over a Postgres pool) to
/// `ErrorRateSource::current_error_rate` (sync, per spec's health
/// collaborator trait in `capture_core`). A background task refreshes a
/// cached value on an interval; `current_error_rate` only ever reads the
/// cache, so the health loop's per-tick check never blocks on I/O.
pub struct JobErrorRateSource {
    cached: Arc<RwLock<f64>>,
}

impl JobErrorRateSource {
    /// Spawns the refresh task and returns immediately; the cache starts
    /// at `0.0` until the first refresh completes.
    pub fn spawn(job_store: JobStore, window: ChronoDuration, refresh_interval: StdDuration) -> Self {
        let cached = Arc::new(RwLock::new(0.0));
        let writer = cached.clone();

        tokio::spawn(async move {
            loop {
                match job_store.recent_error_rate(window).await {
                    Ok(rate) => *writer.write().unwrap() = rate,
                    Err(e) => tracing::warn!(error = %e, "failed to refresh job error rate"),
                }
                tokio::time::sleep(refresh_interval).await;
            }
        });

        Self { cached }
    }
}

impl ErrorRateSource for JobErrorRateSource {
    fn current_error_rate(&self) -> Result<f64> {
        Ok(*self.cached.read().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero_before_first_refresh() {
        let cached = Arc::new(RwLock::new(0.0));
        let source = JobErrorRateSource { cached };
        assert_eq!(source.current_error_rate().unwrap(), 0.0);
    }
}
