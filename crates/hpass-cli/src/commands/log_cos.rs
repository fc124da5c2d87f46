//! Log-cos command: audit an operation on a stored object.

use anyhow::{Context, Result};
use clap::Args;
use hpass_gdpr::CrudOperation;

use super::{print_outcome, recorder, ContextArgs, RecorderArgs, StoreArgs};

/// Arguments for the log-cos command.
#[derive(Args)]
pub struct LogCosArgs {
    /// Storage key of the object (document id in the lookup collection)
    #[arg(short, long)]
    pub key: String,

    /// Entity type owning the object
    #[arg(short, long)]
    pub entity: String,

    /// Operation: create, read, update, delete
    #[arg(short, long)]
    pub operation: CrudOperation,

    #[command(flatten)]
    pub context: ContextArgs,

    #[command(flatten)]
    pub recorder: RecorderArgs,
}

/// Runs the log-cos command.
///
/// # Errors
///
/// Returns an error only if the store configuration is invalid.
pub async fn run(store: &StoreArgs, args: &LogCosArgs, correlation_id: &str) -> Result<()> {
    let logger = recorder(store, &args.recorder).await?;
    let context = args.context.context(correlation_id);

    let outcome = logger
        .log_cos(&context, &args.key, args.operation, &args.entity)
        .await;

    logger.flush().context("Failed to flush audit lines")?;
    print_outcome(&outcome);
    Ok(())
}
