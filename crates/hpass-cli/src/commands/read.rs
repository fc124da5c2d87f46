//! Read command: fetch one document.

use anyhow::{Context, Result};
use clap::Args;
use hpass_store::DocumentStore;

use super::StoreArgs;

/// Arguments for the read command.
#[derive(Args)]
pub struct ReadArgs {
    /// Collection to read from
    #[arg(short, long)]
    pub collection: String,

    /// Document id
    #[arg(short, long)]
    pub id: String,
}

/// Runs the read command and prints the tagged result as JSON.
///
/// # Errors
///
/// Returns an error if the client cannot connect.
pub async fn run(store: &StoreArgs, args: &ReadArgs) -> Result<()> {
    let client = store.client()?;
    client
        .connect()
        .await
        .context("Failed to connect to document store")?;

    let result = client.read_document_safe(&args.id, &args.collection).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
