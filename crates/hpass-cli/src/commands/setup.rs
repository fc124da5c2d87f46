//! Setup command: connect and provision collections.

use anyhow::{Context, Result};
use clap::Args;
use hpass_gdpr::{lookup_collection, AUDIT_COLLECTION};
use hpass_store::DocumentStore;
use tracing::info;

use super::StoreArgs;

/// Arguments for the setup command.
#[derive(Args)]
pub struct SetupArgs {
    /// Entity types whose lookup collections (`<entity>-cos-info`) should also exist
    #[arg(long, value_delimiter = ',')]
    pub entities: Vec<String>,
}

/// Runs the setup command.
///
/// # Errors
///
/// Returns an error if the store cannot be reached or a collection cannot be
/// created.
pub async fn run(store: &StoreArgs, args: &SetupArgs) -> Result<()> {
    let client = store.client()?;

    client
        .setup(AUDIT_COLLECTION)
        .await
        .context("Document store setup failed")?;

    for entity in &args.entities {
        let collection = lookup_collection(entity);
        client
            .ensure_collection(&collection)
            .await
            .with_context(|| format!("Failed to provision {collection}"))?;
        info!(collection = %collection, "Lookup collection ready");
    }

    println!("Document store: {}", client.config().url);
    println!("State:          {:?}", client.state());
    println!("Audit log:      {AUDIT_COLLECTION}");
    for entity in &args.entities {
        println!("Lookup:         {}", lookup_collection(entity));
    }

    Ok(())
}
