//! The document store abstraction shared by the Cloudant client and the
//! in-memory store.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::result::DocumentResult;

/// Lifecycle of a store client. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClientState {
    /// Constructed, not yet connected.
    Uninitialized,
    /// Authenticated against the store.
    Connected,
    /// Connected and at least one collection has been provisioned.
    CollectionReady,
}

/// A remote document database addressed by collection name and document id.
///
/// The safe operations never fail: every store-level problem is reported as
/// [`DocumentResult::Failure`].
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Makes sure the collection exists, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be checked or created.
    async fn ensure_collection(&self, collection: &str) -> Result<(), StoreError>;

    /// Inserts a new document into `collection`.
    async fn create_document_safe(&self, document: &Value, collection: &str) -> DocumentResult;

    /// Reads document `id` from `collection`.
    async fn read_document_safe(&self, id: &str, collection: &str) -> DocumentResult;

    /// Returns the backend name for identification.
    fn name(&self) -> &'static str;
}
