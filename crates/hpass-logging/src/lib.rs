//! Structured logging setup for the health-pass services.
//!
//! Installs a `tracing` subscriber that writes either human-readable text or
//! one JSON object per line, configured from `LOG_LEVEL`, `LOG_FORMAT`,
//! `LOG_FILTER` and `LOG_REDACT`. Loggers are spans carrying a `logger` name and an optional
//! `correlationId`:
//!
//! ```no_run
//! use hpass_logging::{config_span, init_logging, LogConfig};
//! use tracing::info;
//!
//! let config = LogConfig::from_env("hpass-gdpr")?.with_correlation_id("req-1");
//! init_logging(&config)?;
//!
//! let _guard = config_span(&config).entered();
//! info!("service started");
//! # Ok::<(), hpass_logging::LoggingError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod json;
mod span;
mod subscriber;

pub use config::{
    LogConfig, LogFormat, LogLevel, ENV_LOG_FILTER, ENV_LOG_FORMAT, ENV_LOG_LEVEL, ENV_LOG_REDACT,
};
pub use error::LoggingError;
pub use json::{severity, JsonLine, REDACTED};
pub use span::{child_span, config_span, logger_span, LOGGER_SPAN};
pub use subscriber::{build_subscriber, init_logging};
