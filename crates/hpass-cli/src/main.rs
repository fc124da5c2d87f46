//! hpass-gdpr CLI - GDPR audit logging against a Cloudant/CouchDB store.

use anyhow::{Context, Result};
use clap::Parser;
use hpass_logging::{config_span, init_logging};
use tracing::Instrument;

mod commands;

use commands::{Cli, Commands};

/// Logger name used for the process.
const SERVICE_NAME: &str = "hpass-gdpr";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = cli.log_config(SERVICE_NAME, |key| std::env::var(key).ok())?;
    let correlation_id = cli
        .command
        .transaction_id()
        .map_or_else(|| uuid::Uuid::now_v7().to_string(), str::to_string);
    let log_config = log_config.with_correlation_id(correlation_id.clone());
    init_logging(&log_config).context("Failed to initialize logging")?;

    let span = config_span(&log_config);
    run(cli, correlation_id).instrument(span).await
}

async fn run(cli: Cli, correlation_id: String) -> Result<()> {
    match cli.command {
        Commands::Setup(args) => commands::setup::run(&cli.store, &args).await,
        Commands::Log(args) => commands::log::run(&cli.store, &args, &correlation_id).await,
        Commands::LogCos(args) => {
            commands::log_cos::run(&cli.store, &args, &correlation_id).await
        }
        Commands::Read(args) => commands::read::run(&cli.store, &args).await,
        Commands::Version => {
            println!("hpass-gdpr {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
