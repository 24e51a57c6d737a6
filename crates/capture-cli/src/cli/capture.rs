use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use console::style;

use capture_core::config::{CaptureConfig, CaptureInvocation};
use capture_core::job::{JobData, JobKind, JobStatus};
use capture_core::rollout::DEFAULT_FEATURE;
use capture_runtime::forge_client::{CompoundClient, FineGrainedClient, HybridForgeClient, HttpTransport, ReqwestTransport};
use capture_runtime::governor::Governor;
use capture_runtime::router::{BatchBackend, LowLatencyBackend, Router};
use capture_runtime::store::{CaptureStore, JobStore, ProgressStore};
use capture_runtime::workers::WorkerContext;
use capture_runtime::{Database, RolloutController, RolloutStore};

/// Run one capture job for a repository, driven by the environment
/// variables spec §6 names (`REPOSITORY_ID`, `REPOSITORY_NAME`,
/// `PR_NUMBERS`, `TIME_RANGE`, `MAX_ITEMS`, `JOB_ID`, `DAYS_BACK`).
///
/// The job kind itself isn't one of the named environment variables —
/// it is the thing this invocation asks for — so it is a positional
/// argument here rather than read from the environment.
#[derive(Parser)]
pub struct CaptureCommand {
    /// What kind of capture to run.
    pub kind: CaptureKindArg,

    /// Rollout feature name gating this capture.
    #[arg(short, long, default_value = DEFAULT_FEATURE)]
    pub feature: String,

    /// Poll interval while waiting for the job to finish.
    #[arg(long, default_value = "2")]
    pub poll_interval_secs: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CaptureKindArg {
    Details,
    Reviews,
    Comments,
    HistoricalSync,
    FileChanges,
}

impl From<CaptureKindArg> for JobKind {
    fn from(value: CaptureKindArg) -> Self {
        match value {
            CaptureKindArg::Details => JobKind::Details,
            CaptureKindArg::Reviews => JobKind::Reviews,
            CaptureKindArg::Comments => JobKind::Comments,
            CaptureKindArg::HistoricalSync => JobKind::HistoricalSync,
            CaptureKindArg::FileChanges => JobKind::FileChanges,
        }
    }
}

impl CaptureCommand {
    pub async fn execute(self) -> Result<()> {
        dotenvy::dotenv().ok();
        tracing_subscriber::fmt()
            .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
            .try_init()
            .ok();

        println!();
        println!("  {}  Progressive Capture", style("▶").bold().cyan());
        println!();

        let config = CaptureConfig::from_env()?;
        let invocation = CaptureInvocation::from_env()?;

        println!(
            "  {} {} / job kind {:?}",
            style("→").dim(),
            invocation.repository_name,
            self.kind
        );

        let db = Database::from_config(&config.database).await?;
        let pool = db.primary().clone();

        let job_store = JobStore::new(pool.clone());
        let progress_store = ProgressStore::new(pool.clone());
        let capture_store = CaptureStore::new(pool.clone());
        let rollout = RolloutController::new(RolloutStore::new(pool.clone()));

        capture_store
            .upsert_repository(&invocation.repository_id, &invocation.repository_name)
            .await?;
        let category = capture_store.repository_category(&invocation.repository_id).await?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| anyhow!("failed to build HTTP client: {e}"))?;

        let transport: Arc<dyn HttpTransport> =
            Arc::new(ReqwestTransport::new(http_client.clone(), config.forge.token.clone()));
        let governor = Arc::new(Governor::new(config.governor.clone()));

        let compound = CompoundClient::new(transport.clone(), config.forge.base_url.clone(), governor.clone());
        let fine_grained = FineGrainedClient::new(transport, config.forge.base_url.clone(), governor);
        let forge = Arc::new(HybridForgeClient::new(compound, fine_grained, config.forge.use_compound_queries));

        let worker_ctx = WorkerContext::new(
            forge,
            capture_store,
            progress_store.clone(),
            capture_core::job::RetryConfig::default(),
        );

        let lowlatency = Arc::new(LowLatencyBackend::new(
            job_store.clone(),
            progress_store.clone(),
            worker_ctx,
            config.router.lowlatency_concurrency,
            config.router.lowlatency_item_cap,
        ));

        let batch_transport = ReqwestTransport::new(http_client, config.forge.token.clone());
        let batch = Arc::new(BatchBackend::new(
            batch_transport,
            config.router.batch_dispatch_url.clone(),
            job_store.clone(),
        ));

        let router = Router::new(rollout, self.feature, job_store.clone(), lowlatency, batch);

        let data = JobData {
            repository_id: invocation.repository_id.clone(),
            repository_name: invocation.repository_name.clone(),
            pr_numbers: invocation.pr_numbers.clone(),
            time_range_days: invocation.days_back.or(invocation.time_range_days),
            max_items: invocation.max_items,
            trigger_source: invocation.trigger_source(),
        };

        let job = router.enqueue(self.kind.into(), data, category).await?;
        println!(
            "  {} job {} accepted on the {} back-end",
            style("✓").green(),
            job.id,
            job.backend.as_str()
        );

        let finished = self.wait_for_completion(&job_store, job.id).await?;
        match finished.status {
            JobStatus::Completed => {
                println!("  {} job {} completed", style("✓").green(), finished.id);
            }
            JobStatus::Failed => {
                println!(
                    "  {} job {} failed: {}",
                    style("✗").red(),
                    finished.id,
                    finished.last_error.as_deref().unwrap_or("unknown error"),
                );
            }
            _ => {}
        }
        println!();

        if finished.status == JobStatus::Failed {
            return Err(anyhow!("capture job {} failed", finished.id));
        }
        Ok(())
    }

    async fn wait_for_completion(&self, job_store: &JobStore, job_id: uuid::Uuid) -> Result<capture_core::job::Job> {
        loop {
            let job = job_store.get(job_id).await?;
            if job.status.is_terminal() {
                return Ok(job);
            }
            tokio::time::sleep(Duration::from_secs(self.poll_interval_secs)).await;
        }
    }
}
