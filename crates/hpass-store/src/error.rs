//! Error types for document store operations.

use thiserror::Error;

/// Errors that can occur while talking to the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Required configuration values are missing.
    #[error("Cloudant credentials are missing: {}", vars.join(","))]
    MissingConfig {
        /// Names of the missing environment variables.
        vars: Vec<&'static str>,
    },

    /// Invalid URL.
    #[error("Invalid URL: {url}")]
    InvalidUrl {
        /// URL string.
        url: String,
    },

    /// Failed to connect to the store.
    #[error("Failed to connect to document store at {url}: {source}")]
    ConnectionFailed {
        /// Store URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// Authentication failed.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        /// Error message.
        message: String,
    },

    /// The client was used before `connect` succeeded.
    #[error("Document store was not initialized during startup, please check configuration")]
    NotInitialized,

    /// Collection could not be provisioned.
    #[error("Failed to create collection {collection}: {message}")]
    CollectionCreateFailed {
        /// Collection name.
        collection: String,
        /// Error message.
        message: String,
    },

    /// HTTP error reported by the store.
    #[error("HTTP error from document store: {status} - {message}")]
    HttpError {
        /// HTTP status code.
        status: u16,
        /// CouchDB `error` field, or the raw body.
        message: String,
    },

    /// The request failed before the store produced a response.
    #[error("Request to document store failed: {source}")]
    RequestFailed {
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {source}")]
    JsonError {
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Returns the HTTP status attached to this error, if the store answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::ConnectionFailed {
                url: err
                    .url()
                    .map_or_else(|| "unknown".to_string(), ToString::to_string),
                source: err,
            }
        } else if err.is_status() {
            let status = err.status().map_or(0, |s| s.as_u16());
            Self::HttpError {
                status,
                message: err.to_string(),
            }
        } else {
            Self::RequestFailed { source: err }
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError { source: err }
    }
}

impl From<url::ParseError> for StoreError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl {
            url: err.to_string(),
        }
    }
}
