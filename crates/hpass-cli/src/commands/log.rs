//! Log command: audit an operation on a known subject.

use anyhow::{bail, Context, Result};
use clap::Args;
use hpass_gdpr::CrudOperation;

use super::{print_outcome, recorder, ContextArgs, RecorderArgs, StoreArgs};

/// Arguments for the log command.
#[derive(Args)]
pub struct LogArgs {
    /// Subject whose data was touched
    #[arg(short, long)]
    pub subject: String,

    /// Operation: create, read, update, delete
    #[arg(short, long, required_unless_present = "message")]
    pub operation: Option<CrudOperation>,

    /// Free-form message instead of an operation
    #[arg(short, long, conflicts_with = "operation")]
    pub message: Option<String>,

    #[command(flatten)]
    pub context: ContextArgs,

    #[command(flatten)]
    pub recorder: RecorderArgs,
}

/// Runs the log command.
///
/// # Errors
///
/// Returns an error only if the store configuration is invalid; audit
/// failures are reported, not returned.
pub async fn run(store: &StoreArgs, args: &LogArgs, correlation_id: &str) -> Result<()> {
    let logger = recorder(store, &args.recorder).await?;
    let context = args.context.context(correlation_id);

    let outcome = match (&args.message, args.operation) {
        (Some(message), _) => logger.log_message(&context, &args.subject, message).await,
        (None, Some(operation)) => logger.log(&context, &args.subject, operation).await,
        (None, None) => bail!("Either --operation or --message is required"),
    };

    logger.flush().context("Failed to flush audit lines")?;
    print_outcome(&outcome);
    Ok(())
}
