//! Subscriber construction and global installation.

use tracing::Subscriber;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

use crate::config::{LogConfig, LogFormat};
use crate::error::LoggingError;
use crate::json::JsonLine;

/// Builds a subscriber for `config` that writes lines to `writer`.
///
/// JSON lines carry the current span and the full span list, so the logger
/// name and correlation id from [`crate::logger_span`] appear on every event.
/// They also carry a numeric `severity`, and the values of
/// [`LogConfig::redact_fields`] are replaced with [`crate::REDACTED`]. Text
/// lines are written as formatted, without redaction.
///
/// # Errors
///
/// Returns an error if the filter directives do not parse.
pub fn build_subscriber<W>(
    config: &LogConfig,
    writer: W,
) -> Result<impl Subscriber + Send + Sync + 'static, LoggingError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = config.env_filter()?;

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Text => fmt::layer().with_writer(writer).with_target(true).boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .event_format(JsonLine::new(
                fmt::format()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
                &config.redact_fields,
            ))
            .boxed(),
    };

    Ok(tracing_subscriber::registry().with(fmt_layer).with(filter))
}

/// Installs the process-wide subscriber writing to standard output.
///
/// Should be called once at startup.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or a global subscriber
/// is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    build_subscriber(config, std::io::stdout)?.try_init()?;
    Ok(())
}
