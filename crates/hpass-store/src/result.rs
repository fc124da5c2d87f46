//! Tagged results returned by the safe document operations.

use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;

/// Status reported for a successfully created document.
pub const STATUS_CREATED: u16 = 201;

/// Status reported for a successfully read document.
pub const STATUS_OK: u16 = 200;

/// Outcome of a safe store operation.
///
/// Store failures are data, not control flow: callers inspect the variant
/// and decide what to do. Serializes as `{"status":..,"data":..}` or
/// `{"status":..,"message":..}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DocumentResult {
    /// The store accepted the request.
    Success {
        /// `201` for creates, `200` for reads.
        status: u16,
        /// Stored document (read) or the store's `{ok, id, rev}` reply (create).
        data: Value,
    },
    /// The request failed.
    Failure {
        /// HTTP status from the store, `None` when it never answered.
        status: Option<u16>,
        /// CouchDB `error` field or a description of the failure.
        message: String,
    },
}

impl DocumentResult {
    /// Creates a success result.
    #[must_use]
    pub const fn success(status: u16, data: Value) -> Self {
        Self::Success { status, data }
    }

    /// Creates a failure result.
    #[must_use]
    pub fn failure(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Failure {
            status,
            message: message.into(),
        }
    }

    /// Returns the status code, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Success { status, .. } => Some(*status),
            Self::Failure { status, .. } => *status,
        }
    }

    /// Returns `true` for the success variant.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the data of a success result.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        match self {
            Self::Success { data, .. } => Some(data),
            Self::Failure { .. } => None,
        }
    }

    /// Returns the data only when the status matches `expected` and the
    /// data is not JSON `null`.
    #[must_use]
    pub fn data_with_status(&self, expected: u16) -> Option<&Value> {
        match self {
            Self::Success { status, data } if *status == expected && !data.is_null() => Some(data),
            _ => None,
        }
    }
}

impl From<StoreError> for DocumentResult {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::HttpError { status, message } => Self::failure(Some(status), message),
            other => Self::failure(other.status(), other.to_string()),
        }
    }
}
