//! Named logger spans.
//!
//! A logger is a span carrying a `logger` name and an optional
//! `correlationId`. Events recorded inside it inherit both fields, and a
//! child logger overrides the name while keeping the parent's correlation id.

use tracing::{info_span, Span};

use crate::config::LogConfig;

/// Span name shared by every logger span.
pub const LOGGER_SPAN: &str = "logger";

/// Creates a root logger span.
#[must_use]
pub fn logger_span(name: &str, correlation_id: Option<&str>) -> Span {
    info_span!(LOGGER_SPAN, logger = name, correlationId = correlation_id)
}

/// Creates a logger span from a [`LogConfig`].
#[must_use]
pub fn config_span(config: &LogConfig) -> Span {
    logger_span(&config.name, config.correlation_id.as_deref())
}

/// Creates a child logger of `parent` with its own name.
#[must_use]
pub fn child_span(parent: &Span, name: &str) -> Span {
    info_span!(parent: parent, LOGGER_SPAN, logger = name)
}
