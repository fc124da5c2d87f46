//! Audit record definitions.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;

/// Kind of action performed on a subject's personal data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CrudOperation {
    /// Personal data was created
    Create,
    /// Personal data was read
    Read,
    /// Personal data was updated
    Update,
    /// Personal data was deleted
    Delete,
}

impl CrudOperation {
    /// All operations, in CRUD order.
    pub const ALL: [Self; 4] = [Self::Create, Self::Read, Self::Update, Self::Delete];

    /// Returns the wire name of the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for CrudOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown operation name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown CRUD operation: {0}")]
pub struct ParseOperationError(String);

impl FromStr for CrudOperation {
    type Err = ParseOperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseOperationError(s.to_string()))
    }
}

/// One entry of the GDPR audit trail.
///
/// Write-once: the record has no mutators, and the recorder hands it to the
/// store exactly once. Absent context values are omitted from the stored
/// document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    timestamp: i64,
    subject_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    caller_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transaction_id: Option<String>,
    message: String,
}

impl AuditRecord {
    /// Creates a record stamped with the current time (seconds since epoch).
    #[must_use]
    pub fn new(
        context: &RequestContext,
        subject_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now().timestamp(),
            subject_id: subject_id.into(),
            caller_ip: context.caller_ip.clone(),
            url: context.request_url.clone(),
            transaction_id: context.transaction_id.clone(),
            message: message.into(),
        }
    }

    /// Seconds since the Unix epoch at construction time.
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// The data subject the operation concerns.
    #[must_use]
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Caller IP from the request context.
    #[must_use]
    pub fn caller_ip(&self) -> Option<&str> {
        self.caller_ip.as_deref()
    }

    /// Request URL from the request context.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Transaction id from the request context.
    #[must_use]
    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    /// Operation name or free-form description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
