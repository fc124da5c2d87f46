//! Logging configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::error::LoggingError;

/// Environment variable selecting the minimum level.
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

/// Environment variable selecting the output format.
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

/// Environment variable carrying extra filter directives.
pub const ENV_LOG_FILTER: &str = "LOG_FILTER";

/// Environment variable listing comma-separated field paths to redact.
pub const ENV_LOG_REDACT: &str = "LOG_REDACT";

/// Minimum level of emitted events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Very detailed tracing.
    Trace,
    /// Development diagnostics.
    Debug,
    /// Normal operation.
    #[default]
    Info,
    /// Recoverable problems.
    Warn,
    /// Failures.
    Error,
}

impl LogLevel {
    /// Converts to the `tracing` level.
    #[must_use]
    pub const fn as_tracing(self) -> Level {
        match self {
            Self::Trace => Level::TRACE,
            Self::Debug => Level::DEBUG,
            Self::Info => Level::INFO,
            Self::Warn => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Logger name attached to the root span.
    pub name: String,

    /// Minimum level to emit.
    pub level: LogLevel,

    /// Line format.
    pub format: LogFormat,

    /// Correlation id attached to the root span, if any.
    pub correlation_id: Option<String>,

    /// Additional comma-separated filter directives, e.g. `reqwest=warn,hpass_store=debug`.
    pub filter_directives: Option<String>,

    /// Field paths whose values are replaced in JSON lines, e.g. `password`
    /// or `headers.authorization`.
    #[serde(default)]
    pub redact_fields: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            name: "hpass".to_string(),
            level: LogLevel::Info,
            format: LogFormat::Text,
            correlation_id: None,
            filter_directives: None,
            redact_fields: Vec::new(),
        }
    }
}

impl LogConfig {
    /// Creates a configuration with defaults and the given logger name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Loads overrides from `LOG_LEVEL`, `LOG_FORMAT`, `LOG_FILTER` and `LOG_REDACT`.
    ///
    /// # Errors
    ///
    /// Returns an error if a level or format value is not recognized.
    pub fn from_env(name: impl Into<String>) -> Result<Self, LoggingError> {
        Self::from_lookup(name, |key| std::env::var(key).ok())
    }

    /// Loads overrides through `lookup` instead of the process environment.
    ///
    /// Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a level or format value is not recognized.
    pub fn from_lookup(
        name: impl Into<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, LoggingError> {
        let var = |key: &str| lookup(key).filter(|v: &String| !v.trim().is_empty());
        let mut config = Self::new(name);

        if let Some(level) = var(ENV_LOG_LEVEL) {
            config.level = level.parse()?;
        }
        if let Some(format) = var(ENV_LOG_FORMAT) {
            config.format = format.parse()?;
        }
        config.filter_directives = var(ENV_LOG_FILTER);
        if let Some(fields) = var(ENV_LOG_REDACT) {
            config.redact_fields = split_list(&fields);
        }

        Ok(config)
    }

    /// Sets the minimum level.
    #[must_use]
    pub const fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the line format.
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Sets extra filter directives.
    #[must_use]
    pub fn with_filter_directives(mut self, directives: impl Into<String>) -> Self {
        self.filter_directives = Some(directives.into());
        self
    }

    /// Sets the field paths redacted from JSON lines.
    #[must_use]
    pub fn with_redact_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.redact_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Builds the event filter: the base level plus every extra directive.
    ///
    /// # Errors
    ///
    /// Returns an error if a directive does not parse.
    pub fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        let mut filter = EnvFilter::default().add_directive(self.level.as_tracing().into());

        let directives = self.filter_directives.as_deref().unwrap_or_default();
        for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            let parsed: Directive =
                directive
                    .parse()
                    .map_err(|source| LoggingError::InvalidDirective {
                        directive: directive.to_string(),
                        source,
                    })?;
            filter = filter.add_directive(parsed);
        }

        Ok(filter)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
