//! In-memory document store for tests and local runs.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::error::StoreError;
use crate::result::{DocumentResult, STATUS_CREATED, STATUS_OK};
use crate::store::DocumentStore;

#[derive(Debug, Default)]
struct Collections {
    documents: HashMap<String, BTreeMap<String, Value>>,
    creations: HashMap<String, usize>,
    writes: usize,
}

/// Document store that keeps everything in process memory.
///
/// Behaves like CouchDB for the operations the audit path uses: writes into
/// a missing collection and reads of missing documents fail with status 404
/// and message `not_found`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
    write_failure: Option<(Option<u16>, String)>,
    next_id: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store with no collections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write fail with the given status and message.
    #[must_use]
    pub fn failing_writes(mut self, status: Option<u16>, message: impl Into<String>) -> Self {
        self.write_failure = Some((status, message.into()));
        self
    }

    /// Stores `document` under `id`, creating the collection if needed.
    pub fn insert(&self, collection: &str, id: &str, document: Value) {
        self.inner
            .lock()
            .documents
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
    }

    /// Returns every document in `collection`, ordered by id.
    #[must_use]
    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.inner
            .lock()
            .documents
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns how many times `collection` was created by `ensure_collection`.
    #[must_use]
    pub fn creations(&self, collection: &str) -> usize {
        self.inner
            .lock()
            .creations
            .get(collection)
            .copied()
            .unwrap_or(0)
    }

    /// Returns the number of write attempts, successful or not.
    #[must_use]
    pub fn write_attempts(&self) -> usize {
        self.inner.lock().writes
    }

    fn not_found() -> DocumentResult {
        DocumentResult::failure(Some(404), "not_found")
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ensure_collection(&self, collection: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if !inner.documents.contains_key(collection) {
            inner
                .documents
                .insert(collection.to_string(), BTreeMap::new());
            *inner.creations.entry(collection.to_string()).or_default() += 1;
        }
        Ok(())
    }

    async fn create_document_safe(&self, document: &Value, collection: &str) -> DocumentResult {
        let mut inner = self.inner.lock();
        inner.writes += 1;

        if let Some((status, message)) = &self.write_failure {
            return DocumentResult::failure(*status, message.clone());
        }

        let Some(docs) = inner.documents.get_mut(collection) else {
            return Self::not_found();
        };

        let id = document
            .get("_id")
            .and_then(Value::as_str)
            .map_or_else(
                || format!("{:016x}", self.next_id.fetch_add(1, Ordering::Relaxed)),
                ToString::to_string,
            );

        if docs.contains_key(&id) {
            return DocumentResult::failure(Some(409), "conflict");
        }
        docs.insert(id.clone(), document.clone());

        DocumentResult::success(STATUS_CREATED, json!({"ok": true, "id": id, "rev": "1-memory"}))
    }

    async fn read_document_safe(&self, id: &str, collection: &str) -> DocumentResult {
        self.inner
            .lock()
            .documents
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map_or_else(Self::not_found, |doc| {
                DocumentResult::success(STATUS_OK, doc.clone())
            })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
