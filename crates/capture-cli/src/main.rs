mod cli;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    if let Err(e) = cli.execute().await {
        eprintln!("  {} {}", console::style("✗").red(), e);
        std::process::exit(1);
    }
    Ok(())
}
