use std::time::Duration as StdDuration;

use anyhow::Result;
use chrono::Duration as ChronoDuration;
use clap::Parser;
use console::style;

use capture_core::config::{CaptureConfig, HealthCheckParams};
use capture_core::rollout::DEFAULT_FEATURE;
use capture_runtime::rollout::JobErrorRateSource;
use capture_runtime::store::JobStore;
use capture_runtime::{Database, HealthCollaborator, RolloutController, RolloutStore};

const DEFAULT_WINDOW_MINUTES: i64 = 15;
const DEFAULT_CRITICAL_ERROR_RATE: f64 = 0.10;
const DEFAULT_REPORT_DIR: &str = "./rollback-reports";

/// Run one health-collaborator check, driven by `CHECK_TYPE` and
/// `FORCE_CHECK` (spec §6). Intended to be invoked on a schedule by an
/// external scheduler rather than run as a long-lived process.
#[derive(Parser)]
pub struct HealthCommand {
    #[arg(short, long, default_value = DEFAULT_FEATURE)]
    pub feature: String,
}

impl HealthCommand {
    pub async fn execute(self) -> Result<()> {
        dotenvy::dotenv().ok();
        tracing_subscriber::fmt()
            .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
            .try_init()
            .ok();

        println!();
        println!("  {}  Health Check", style("♥").bold().magenta());
        println!();

        let params = HealthCheckParams::from_env()?;
        let config = CaptureConfig::from_env()?;
        let db = Database::from_config(&config.database).await?;
        let pool = db.primary().clone();

        let window_minutes: i64 = std::env::var("HEALTH_CHECK_WINDOW_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_WINDOW_MINUTES);
        let critical_error_rate: f64 = std::env::var("HEALTH_CRITICAL_ERROR_RATE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CRITICAL_ERROR_RATE);
        let report_dir = std::env::var("ROLLBACK_REPORT_DIR").unwrap_or_else(|_| DEFAULT_REPORT_DIR.to_string());

        let window = ChronoDuration::minutes(window_minutes);
        let source = JobErrorRateSource::spawn(JobStore::new(pool.clone()), window, StdDuration::from_secs(30));
        // Give the refresh task one chance to populate the cache before
        // the check reads it.
        tokio::time::sleep(StdDuration::from_millis(200)).await;

        let controller = RolloutController::new(RolloutStore::new(pool));
        let collaborator = HealthCollaborator::new(
            controller,
            source,
            self.feature.clone(),
            StdDuration::from_secs(60),
            critical_error_rate,
            report_dir,
        );

        println!(
            "  {} check_type={:?} force_check={}",
            style("→").dim(),
            params.check_type,
            params.force_check,
        );

        match collaborator.check_once(params.check_type).await? {
            Some(report) => {
                println!(
                    "  {} rollback triggered: error_rate={:.3} status={}",
                    style("✗").red(),
                    report.error_rate,
                    report.status,
                );
            }
            None => {
                println!("  {} no action needed", style("✓").green());
            }
        }

        println!();
        Ok(())
    }
}
