use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;

use capture_core::config::CaptureConfig;
use capture_core::rollout::DEFAULT_FEATURE;
use capture_runtime::{Database, RolloutController, RolloutStore};

/// Inspect or change the hybrid-capture rollout gate (spec's CLI table:
/// `query`, `update`, `stop`, `resume`, `history`).
#[derive(Parser)]
pub struct RolloutCommand {
    #[command(subcommand)]
    pub action: RolloutAction,

    /// Feature name. Defaults to the hybrid progressive capture rollout.
    #[arg(short, long, global = true, default_value = DEFAULT_FEATURE)]
    pub feature: String,
}

#[derive(Subcommand)]
pub enum RolloutAction {
    /// Print the current rollout configuration.
    Query,

    /// Set the rollout percentage.
    Update {
        /// New percentage, 0-100.
        percentage: u8,

        /// Reason recorded in the rollout history.
        #[arg(short, long, default_value = "manual update")]
        reason: String,
    },

    /// Emergency-stop the rollout (forces effective percentage to 0).
    Stop {
        #[arg(short, long, default_value = "manual stop")]
        reason: String,
    },

    /// Resume a stopped rollout.
    Resume {
        #[arg(short, long, default_value = "manual resume")]
        reason: String,
    },

    /// Print the rollout history.
    History {
        /// Maximum number of entries to show.
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
}

impl RolloutCommand {
    pub async fn execute(self) -> Result<()> {
        dotenvy::dotenv().ok();
        tracing_subscriber::fmt()
            .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
            .try_init()
            .ok();

        let config = CaptureConfig::from_env()?;
        let db = Database::from_config(&config.database).await?;
        let controller = RolloutController::new(RolloutStore::new(db.primary().clone()));

        println!();
        println!("  {}  Rollout — {}", style("⚑").bold(), style(&self.feature).cyan());
        println!();

        match self.action {
            RolloutAction::Query => {
                let current = controller.query(&self.feature).await?;
                print_configuration(&current);
            }
            RolloutAction::Update { percentage, reason } => {
                controller.update(&self.feature, percentage, &reason).await?;
                let current = controller.query(&self.feature).await?;
                println!("  {} updated to {}%", style("✓").green(), current.percentage);
                print_configuration(&current);
            }
            RolloutAction::Stop { reason } => {
                let current = controller.stop(&self.feature, &reason).await?;
                println!("  {} emergency stop engaged", style("✓").green());
                print_configuration(&current);
            }
            RolloutAction::Resume { reason } => {
                controller.resume(&self.feature, &reason).await?;
                let current = controller.query(&self.feature).await?;
                println!("  {} resumed", style("✓").green());
                print_configuration(&current);
            }
            RolloutAction::History { limit } => {
                let history = controller.history(&self.feature, limit).await?;
                if history.is_empty() {
                    println!("  {} no history recorded", style("ℹ").blue());
                } else {
                    for entry in &history {
                        println!(
                            "  {} {} {} -> {}% ({}, by {})",
                            style(entry.created_at.format("%Y-%m-%d %H:%M:%S")).dim(),
                            style("→").dim(),
                            entry.previous_percentage,
                            entry.new_percentage,
                            entry.reason,
                            entry.triggered_by,
                        );
                    }
                }
            }
        }

        println!();
        Ok(())
    }
}

fn print_configuration(config: &capture_core::rollout::RolloutConfiguration) {
    println!(
        "  {} percentage={}% strategy={:?} active={} emergency_stop={}",
        style("ℹ").blue(),
        config.percentage,
        config.strategy,
        config.is_active,
        config.emergency_stop,
    );
    println!(
        "  {} effective percentage: {}%",
        style("→").dim(),
        config.effective_percentage(),
    );
}
