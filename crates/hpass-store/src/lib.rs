//! # hpass-store
//!
//! Document store client used by the health-pass GDPR audit trail.
//!
//! The store is a CouchDB-compatible database (IBM Cloudant) addressed by
//! collection name and document id. Besides connection and collection
//! provisioning, the client exposes two *safe* operations that never fail:
//! store errors come back as [`DocumentResult::Failure`] values so that
//! callers can treat them as ordinary data.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hpass_store::{CloudantClient, DocumentStore, StoreConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // CLOUDANT_URL and CLOUDANT_IAM_KEY are both required
//!     let client = CloudantClient::new(StoreConfig::from_env()?)?;
//!     client.setup("gdpr-audit-log").await?;
//!
//!     let result = client
//!         .create_document_safe(&json!({"subjectId": "subject-42"}), "gdpr-audit-log")
//!         .await;
//!     println!("{}", serde_json::to_string(&result)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized ──connect()──▶ Connected ──ensure_collection()──▶ CollectionReady
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod auth;
mod client;
mod config;
mod error;
mod memory;
mod result;
mod store;

pub use client::CloudantClient;
pub use config::{
    StoreAuth, StoreConfig, DEFAULT_IAM_URL, ENV_IAM_KEY, ENV_IAM_URL, ENV_STORE_URL,
};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use result::{DocumentResult, STATUS_CREATED, STATUS_OK};
pub use store::{ClientState, DocumentStore};
