use std::path::{Path, PathBuf};
use std::time::Duration;

use capture_core::config::CheckType;
use capture_core::error::Result;
use capture_core::observability::{AlertCondition, AlertState};
use capture_core::rollout::DEFAULT_FEATURE;
use serde::Serialize;
use tokio::sync::watch;

use super::controller::RolloutController;

/// Source of the in-flight job error rate the collaborator evaluates.
/// Implemented by whatever reads `progressive_capture_jobs` in the
/// concrete deployment; kept as a trait so the health loop itself never
/// touches SQL directly.
pub trait ErrorRateSource: Send + Sync {
    fn current_error_rate(&self) -> Result<f64>;
}

/// Periodic collaborator that reads in-flight job error rates and, on a
/// critical threshold breach, triggers an automated rollback + verify
/// (spec §4.4 "Automated rollback").
///
/// Grounded on the teacher's `cluster::leader::LeaderElection::run` shape:
/// a `tokio::select!` loop racing a timer against a `watch` shutdown
/// channel, with an `AlertState` tracking pending → firing → resolved
/// transitions before acting.
pub struct HealthCollaborator<S: ErrorRateSource> {
    controller: RolloutController,
    source: S,
    feature: String,
    check_interval: Duration,
    critical_error_rate: f64,
    alert: std::sync::Mutex<AlertState>,
    alert_condition: AlertCondition,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    report_dir: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct IncidentReport {
    pub feature: String,
    pub triggered_by: &'static str,
    pub reason: String,
    pub error_rate: f64,
    pub expected_percentage: u8,
    pub status: &'static str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<S: ErrorRateSource> HealthCollaborator<S> {
    pub fn new(
        controller: RolloutController,
        source: S,
        feature: impl Into<String>,
        check_interval: Duration,
        critical_error_rate: f64,
        report_dir: impl Into<PathBuf>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            controller,
            source,
            feature: feature.into(),
            check_interval,
            critical_error_rate,
            alert: std::sync::Mutex::new(AlertState::default()),
            alert_condition: AlertCondition::immediate("job_error_rate > critical_threshold"),
            shutdown_tx,
            shutdown_rx,
            report_dir: report_dir.into(),
        }
    }

    pub fn with_default_feature(
        controller: RolloutController,
        source: S,
        check_interval: Duration,
        critical_error_rate: f64,
        report_dir: impl Into<PathBuf>,
    ) -> Self {
        Self::new(controller, source, DEFAULT_FEATURE, check_interval, critical_error_rate, report_dir)
    }

    pub fn shutdown_sender(&self) -> watch::Sender<bool> {
        self.shutdown_tx.clone()
    }

    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Evaluate error rate once and, if critical, perform the automated
    /// rollback + verify + incident-report sequence. Returns the incident
    /// report iff a rollback was triggered.
    pub async fn check_once(&self, check_type: CheckType) -> Result<Option<IncidentReport>> {
        if check_type == CheckType::MetricsOnly {
            return Ok(None);
        }

        let error_rate = self.source.current_error_rate()?;

        {
            let mut alert = self.alert.lock().unwrap();
            alert.update_evaluation(error_rate);
            if error_rate > self.critical_error_rate {
                alert.set_pending();
                if alert.should_fire(self.alert_condition.for_duration) {
                    alert.set_firing();
                }
            } else {
                alert.set_resolved();
            }
        }

        let firing = self.alert.lock().unwrap().status == capture_core::observability::AlertStatus::Firing;
        if !firing {
            return Ok(None);
        }

        let reason = format!("Health monitor detected critical issues (error_rate={error_rate:.3})");
        tracing::error!(feature = %self.feature, error_rate, "triggering automated rollback");

        self.controller.rollback(&self.feature, 0, &reason).await?;
        let verified = self.controller.verify(&self.feature, 0).await?;

        if !verified {
            tracing::error!(feature = %self.feature, "rollback verify mismatch: fatal alert");
        }
        self.alert.lock().unwrap().set_resolved();

        let report = IncidentReport {
            feature: self.feature.clone(),
            triggered_by: "automated_health_check",
            reason,
            error_rate,
            expected_percentage: 0,
            status: if verified { "verified" } else { "mismatch" },
            timestamp: chrono::Utc::now(),
        };

        self.write_report(&report).await?;
        Ok(Some(report))
    }

    async fn write_report(&self, report: &IncidentReport) -> Result<()> {
        let path = self.report_path(report.timestamp);
        let json = serde_json::to_vec_pretty(report)?;
        tokio::fs::create_dir_all(&self.report_dir)
            .await
            .map_err(capture_core::error::CaptureError::Io)?;
        tokio::fs::write(&path, json)
            .await
            .map_err(capture_core::error::CaptureError::Io)?;
        Ok(())
    }

    fn report_path(&self, timestamp: chrono::DateTime<chrono::Utc>) -> PathBuf {
        Path::new(&self.report_dir).join(format!("rollback-report-{}.json", timestamp.timestamp()))
    }

    /// Run the periodic loop until `stop()` is called, per `FORCE_CHECK`
    /// controlling whether the first iteration runs immediately.
    pub async fn run(&self, check_type: CheckType, force_check: bool) {
        let mut shutdown_rx = self.shutdown_rx.clone();

        if force_check {
            if let Err(e) = self.check_once(check_type).await {
                tracing::warn!(error = %e, "health check failed");
            }
        }

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.check_interval) => {
                    if let Err(e) = self.check_once(check_type).await {
                        tracing::warn!(error = %e, "health check failed");
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("health collaborator shutting down");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollout::store::RolloutStore;

    struct FixedRate(f64);

    impl ErrorRateSource for FixedRate {
        fn current_error_rate(&self) -> Result<f64> {
            Ok(self.0)
        }
    }

    fn lazy_pool() -> sqlx::PgPool {
        sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy("postgres://localhost/nonexistent")
            .expect("failed to create lazy pool")
    }

    fn collaborator(rate: f64) -> HealthCollaborator<FixedRate> {
        let controller = RolloutController::new(RolloutStore::new(lazy_pool()));
        HealthCollaborator::with_default_feature(
            controller,
            FixedRate(rate),
            Duration::from_secs(60),
            0.05,
            std::env::temp_dir(),
        )
    }

    #[tokio::test]
    async fn below_threshold_never_touches_the_store() {
        // A non-critical rate resolves the alert before any rollback call
        // is attempted, so this never needs a live database connection.
        let health = collaborator(0.01);
        let report = health.check_once(CheckType::Full).await.unwrap();
        assert!(report.is_none());
    }

    #[tokio::test]
    async fn metrics_only_check_type_never_evaluates() {
        let health = collaborator(0.99);
        let report = health.check_once(CheckType::MetricsOnly).await.unwrap();
        assert!(report.is_none());
    }
}
