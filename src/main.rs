use clap::Parser;

use gateway_bridge::cli::Cli;
use gateway_bridge::lifecycle::startup;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    startup::run(cli).await
}
