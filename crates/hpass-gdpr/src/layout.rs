//! JSON layout of the local audit log line consumed by the log pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;

/// Level written on audit lines.
pub const AUDIT_LEVEL: &str = "INFO";

/// One structured log line per audit event.
///
/// Serializes to
/// `{"timestamp","level","name","x-hpass-txn-id","subject_id","url","message"}`
/// with absent optional fields left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogLine {
    /// Emission time.
    pub timestamp: DateTime<Utc>,

    /// Log level label.
    pub level: String,

    /// Logger name.
    pub name: String,

    /// Transaction id of the request.
    #[serde(
        rename = "x-hpass-txn-id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub transaction_id: Option<String>,

    /// Subject the line is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,

    /// Request URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Human-readable message, e.g. `GDPR: CREATE`.
    pub message: String,
}

impl AuditLogLine {
    /// Creates an `INFO` line for `subject_id` using the request context.
    ///
    /// Empty strings are treated as absent.
    #[must_use]
    pub fn info(
        name: impl Into<String>,
        message: impl Into<String>,
        subject_id: &str,
        context: &RequestContext,
    ) -> Self {
        let present = |value: Option<&str>| value.filter(|v| !v.is_empty()).map(str::to_string);

        Self {
            timestamp: Utc::now(),
            level: AUDIT_LEVEL.to_string(),
            name: name.into(),
            transaction_id: present(context.transaction_id.as_deref()),
            subject_id: present(Some(subject_id)),
            url: present(context.request_url.as_deref()),
            message: message.into(),
        }
    }

    /// Renders the line as a single JSON object.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
