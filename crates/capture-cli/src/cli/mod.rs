mod capture;
mod health;
mod rollout;

pub use capture::CaptureCommand;
pub use health::HealthCommand;
pub use rollout::RolloutCommand;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Hybrid progressive capture: operator CLI.
#[derive(Parser)]
#[command(name = "pcapture")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect or change the hybrid-capture rollout gate.
    Rollout(RolloutCommand),

    /// Run one capture job from the environment (spec's `REPOSITORY_ID` et al.).
    Capture(CaptureCommand),

    /// Run one health-collaborator check from the environment.
    Health(HealthCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Rollout(cmd) => cmd.execute().await,
            Commands::Capture(cmd) => cmd.execute().await,
            Commands::Health(cmd) => cmd.execute().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rollout_query() {
        let cli = Cli::try_parse_from(["pcapture", "rollout", "query"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn parses_capture() {
        let cli = Cli::try_parse_from(["pcapture", "capture", "details"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn parses_health() {
        let cli = Cli::try_parse_from(["pcapture", "health"]);
        assert!(cli.is_ok());
    }
}
