//! Error types for logging setup.

use thiserror::Error;

/// Errors raised while configuring or installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Unknown level name.
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// Unknown format name.
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// A filter directive did not parse.
    #[error("Invalid filter directive '{directive}': {source}")]
    InvalidDirective {
        /// The offending directive.
        directive: String,
        /// Parser error.
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    /// A global subscriber is already installed.
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}
