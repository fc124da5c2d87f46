//! The GDPR audit recorder.
//!
//! Audit calls are attached to business operations and must never make them
//! fail: every problem is logged and reported through [`AuditOutcome`],
//! which callers are free to ignore.

use std::sync::Arc;

use hpass_store::{DocumentResult, DocumentStore, STATUS_CREATED, STATUS_OK};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::context::RequestContext;
use crate::layout::AuditLogLine;
use crate::record::{AuditRecord, CrudOperation};
use crate::sink::{LogLineSink, LoggerError, WriterBackend};

/// Collection receiving audit records.
pub const AUDIT_COLLECTION: &str = "gdpr-audit-log";

/// Suffix of the per-entity lookup collections.
pub const COS_INFO_SUFFIX: &str = "cos-info";

/// Logger name written on audit lines.
pub const LOGGER_NAME: &str = "gdpr-logger";

/// Field of a stored object reference naming its subject.
pub const HOLDER_ID_FIELD: &str = "holder_id";

/// Returns the lookup collection for `entity_type`: `"<entity_type>-cos-info"`.
///
/// # Examples
///
/// ```
/// assert_eq!(hpass_gdpr::lookup_collection("entityA"), "entityA-cos-info");
/// ```
#[must_use]
pub fn lookup_collection(entity_type: &str) -> String {
    format!("{entity_type}-{COS_INFO_SUFFIX}")
}

/// What an audit call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    /// The record was written to the store.
    Recorded,
    /// Auditing is disabled; nothing was logged or written.
    Disabled,
    /// No subject id could be determined; nothing was written.
    SubjectUnresolved {
        /// Why the subject could not be determined.
        reason: String,
    },
    /// The line was logged but the store did not accept the record.
    PersistFailed {
        /// Store status, if the store answered.
        status: Option<u16>,
        /// Store message.
        message: String,
    },
}

impl AuditOutcome {
    /// Returns `true` if the record reached the store.
    #[must_use]
    pub const fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded)
    }
}

/// Records GDPR audit entries for operations on personal data.
///
/// Cheap to clone; clones share the store and sinks.
#[derive(Debug, Clone)]
pub struct GdprLogger {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    store: Arc<dyn DocumentStore>,
    sinks: Vec<Arc<dyn LogLineSink>>,
    enabled: bool,
    name: String,
    audit_collection: String,
}

impl GdprLogger {
    /// Creates a recorder writing one flat JSON line per event to standard
    /// output.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::builder(store)
            .with_sink(Arc::new(WriterBackend::stdout()))
            .build()
    }

    /// Creates a builder for configuring the recorder.
    #[must_use]
    pub fn builder(store: Arc<dyn DocumentStore>) -> GdprLoggerBuilder {
        GdprLoggerBuilder::new(store)
    }

    /// Returns whether auditing is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    /// Returns the collection audit records are written to.
    #[must_use]
    pub fn audit_collection(&self) -> &str {
        &self.inner.audit_collection
    }

    /// Returns the number of configured sinks.
    #[must_use]
    pub fn sink_count(&self) -> usize {
        self.inner.sinks.len()
    }

    /// Flushes every sink.
    ///
    /// # Errors
    ///
    /// Returns an error if any sink fails to flush.
    pub fn flush(&self) -> Result<(), LoggerError> {
        for sink in &self.inner.sinks {
            sink.flush()?;
        }
        Ok(())
    }

    /// Audits `operation` on `subject_id`.
    ///
    /// Emits one line to every sink, then writes one [`AuditRecord`] to the
    /// audit collection.
    pub async fn log(
        &self,
        context: &RequestContext,
        subject_id: &str,
        operation: CrudOperation,
    ) -> AuditOutcome {
        self.record(context, subject_id, operation.as_str()).await
    }

    /// Audits a free-form `message` about `subject_id`.
    pub async fn log_message(
        &self,
        context: &RequestContext,
        subject_id: &str,
        message: &str,
    ) -> AuditOutcome {
        self.record(context, subject_id, message).await
    }

    /// Audits `operation` on a stored object, resolving its subject first.
    ///
    /// Reads `storage_key` from `"<entity_type>-cos-info"`; the subject is
    /// the document's `holder_id`. If the lookup fails or yields no holder,
    /// nothing is recorded.
    pub async fn log_cos(
        &self,
        context: &RequestContext,
        storage_key: &str,
        operation: CrudOperation,
        entity_type: &str,
    ) -> AuditOutcome {
        if !self.inner.enabled {
            debug!("Audit logging disabled, skipping event");
            return AuditOutcome::Disabled;
        }

        let collection = lookup_collection(entity_type);
        let response = self
            .inner
            .store
            .read_document_safe(storage_key, &collection)
            .await;

        match holder_id(&response) {
            Some(subject_id) => self.log(context, subject_id, operation).await,
            None => {
                let rendered = render(&response);
                error!(
                    storage_key,
                    collection = %collection,
                    "COS document not found. Unable to log. {rendered}"
                );
                AuditOutcome::SubjectUnresolved {
                    reason: format!("no {HOLDER_ID_FIELD} for {storage_key} in {collection}"),
                }
            }
        }
    }

    /// Runs [`GdprLogger::log`] on the tokio runtime without waiting for it.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn spawn_log(
        &self,
        context: RequestContext,
        subject_id: impl Into<String>,
        operation: CrudOperation,
    ) -> JoinHandle<AuditOutcome> {
        let this = self.clone();
        let subject_id = subject_id.into();
        tokio::spawn(async move { this.log(&context, &subject_id, operation).await })
    }

    /// Runs [`GdprLogger::log_cos`] on the tokio runtime without waiting for it.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn spawn_log_cos(
        &self,
        context: RequestContext,
        storage_key: impl Into<String>,
        operation: CrudOperation,
        entity_type: impl Into<String>,
    ) -> JoinHandle<AuditOutcome> {
        let this = self.clone();
        let storage_key = storage_key.into();
        let entity_type = entity_type.into();
        tokio::spawn(async move {
            this.log_cos(&context, &storage_key, operation, &entity_type)
                .await
        })
    }

    async fn record(
        &self,
        context: &RequestContext,
        subject_id: &str,
        message: &str,
    ) -> AuditOutcome {
        if !self.inner.enabled {
            debug!("Audit logging disabled, skipping event");
            return AuditOutcome::Disabled;
        }

        if subject_id.is_empty() {
            error!(operation = message, "GDPR: subject id is empty. Unable to log.");
            return AuditOutcome::SubjectUnresolved {
                reason: "empty subject id".to_string(),
            };
        }

        self.emit(&AuditLogLine::info(
            &self.inner.name,
            format!("GDPR: {message}"),
            subject_id,
            context,
        ));

        let record = AuditRecord::new(context, subject_id, message);
        self.persist(&record).await
    }

    fn emit(&self, line: &AuditLogLine) {
        for sink in &self.inner.sinks {
            if let Err(e) = sink.emit(line) {
                error!("Failed to write audit line to sink {}: {}", sink.name(), e);
            }
        }
    }

    async fn persist(&self, record: &AuditRecord) -> AuditOutcome {
        let document = match serde_json::to_value(record) {
            Ok(document) => document,
            Err(e) => {
                error!(error = %e, "Failed to serialize audit record");
                return AuditOutcome::PersistFailed {
                    status: None,
                    message: e.to_string(),
                };
            }
        };

        let response = self
            .inner
            .store
            .create_document_safe(&document, &self.inner.audit_collection)
            .await;

        if response.data_with_status(STATUS_CREATED).is_some() {
            return AuditOutcome::Recorded;
        }

        error!("Unable to create audit document. {}", render(&response));
        match response {
            DocumentResult::Failure { status, message } => {
                AuditOutcome::PersistFailed { status, message }
            }
            DocumentResult::Success { status, .. } => AuditOutcome::PersistFailed {
                status: Some(status),
                message: "unexpected store response".to_string(),
            },
        }
    }
}

/// Extracts a non-empty `holder_id` from a successful lookup.
fn holder_id(response: &DocumentResult) -> Option<&str> {
    response
        .data_with_status(STATUS_OK)?
        .get(HOLDER_ID_FIELD)
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

fn render(response: &DocumentResult) -> String {
    serde_json::to_string(response).unwrap_or_else(|_| format!("{response:?}"))
}

/// Builder for configuring a [`GdprLogger`].
#[derive(Debug)]
pub struct GdprLoggerBuilder {
    store: Arc<dyn DocumentStore>,
    sinks: Vec<Arc<dyn LogLineSink>>,
    enabled: bool,
    name: String,
    audit_collection: String,
}

impl GdprLoggerBuilder {
    /// Creates a new builder with no sinks.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            sinks: Vec::new(),
            enabled: true,
            name: LOGGER_NAME.to_string(),
            audit_collection: AUDIT_COLLECTION.to_string(),
        }
    }

    /// Adds a sink for audit lines.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LogLineSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Enables or disables auditing.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the logger name written on audit lines.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the collection audit records are written to.
    #[must_use]
    pub fn audit_collection(mut self, collection: impl Into<String>) -> Self {
        self.audit_collection = collection.into();
        self
    }

    /// Builds the recorder.
    #[must_use]
    pub fn build(self) -> GdprLogger {
        GdprLogger {
            inner: Arc::new(Inner {
                store: self.store,
                sinks: self.sinks,
                enabled: self.enabled,
                name: self.name,
                audit_collection: self.audit_collection,
            }),
        }
    }
}
