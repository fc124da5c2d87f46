//! GDPR audit logging for the health-pass backend.
//!
//! This crate records who touched which data subject's personal data:
//! - Direct operations, where the subject id is known ([`GdprLogger::log`])
//! - Operations on stored objects, where the subject is resolved from the
//!   object's `holder_id` first ([`GdprLogger::log_cos`])
//!
//! Every audit call emits one structured line locally and writes one
//! [`AuditRecord`] to the `gdpr-audit-log` collection. Auditing never fails
//! the operation it is attached to: errors are logged and reported as an
//! [`AuditOutcome`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use hpass_gdpr::{CrudOperation, GdprLogger, RequestContext, AUDIT_COLLECTION};
//! use hpass_store::{DocumentStore, MemoryStore};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let store = Arc::new(MemoryStore::new());
//! store.ensure_collection(AUDIT_COLLECTION).await.unwrap();
//!
//! let logger = GdprLogger::new(store.clone());
//! let ctx = RequestContext::new()
//!     .with_transaction_id("T1")
//!     .with_caller_ip("1.2.3.4")
//!     .with_request_url("/x");
//!
//! let outcome = logger.log(&ctx, "subject-42", CrudOperation::Create).await;
//! assert!(outcome.is_recorded());
//! # });
//! ```

mod context;
mod layout;
mod record;
mod recorder;
mod sink;


pub use context::{RequestContext, CALLER_IP_KEY, REQUEST_URL_KEY, TRANSACTION_ID_KEY};
pub use layout::{AuditLogLine, AUDIT_LEVEL};
pub use record::{AuditRecord, CrudOperation, ParseOperationError};
pub use recorder::{
    lookup_collection, AuditOutcome, GdprLogger, GdprLoggerBuilder, AUDIT_COLLECTION,
    COS_INFO_SUFFIX, HOLDER_ID_FIELD, LOGGER_NAME,
};
pub use sink::{InMemoryBackend, LogLineSink, LoggerError, TracingBackend, WriterBackend};
