//! JSON line post-processing: numeric severity and field redaction.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Replacement written for redacted values.
pub const REDACTED: &str = "[redacted]";

/// Wraps a JSON event formatter.
///
/// Every line gains a numeric `severity` next to its `level` label
/// (10 trace, 20 debug, 30 info, 40 warn, 50 error), and each configured
/// path has its value replaced with [`REDACTED`]. A path is a dotted key
/// sequence such as `password` or `headers.authorization`, matched against
/// the event fields, the current span and every span in the span list.
#[derive(Debug, Clone)]
pub struct JsonLine<F> {
    inner: F,
    redact: Arc<[Vec<String>]>,
}

impl<F> JsonLine<F> {
    /// Wraps `inner`, redacting the given paths.
    pub fn new(inner: F, redact_paths: &[String]) -> Self {
        let redact = redact_paths
            .iter()
            .map(|path| path.split('.').map(str::to_string).collect::<Vec<_>>())
            .filter(|segments| segments.iter().all(|s| !s.is_empty()))
            .collect();
        Self { inner, redact }
    }
}

impl<S, N, F> FormatEvent<S, N> for JsonLine<F>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'w> FormatFields<'w> + 'static,
    F: FormatEvent<S, N>,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut line = String::new();
        self.inner.format_event(ctx, Writer::new(&mut line), event)?;

        let Ok(Value::Object(mut object)) = serde_json::from_str::<Value>(line.trim_end()) else {
            return writer.write_str(&line);
        };

        object.insert(
            "severity".to_string(),
            Value::from(severity(*event.metadata().level())),
        );

        let mut value = Value::Object(object);
        for path in self.redact.iter() {
            redact_path(&mut value, path);
            for scope in ["fields", "span"] {
                if let Some(nested) = value.get_mut(scope) {
                    redact_path(nested, path);
                }
            }
            if let Some(Value::Array(spans)) = value.get_mut("spans") {
                for span in spans {
                    redact_path(span, path);
                }
            }
        }

        writeln!(writer, "{value}")
    }
}

/// Numeric severity of a level.
#[must_use]
pub const fn severity(level: Level) -> u8 {
    match level {
        Level::TRACE => 10,
        Level::DEBUG => 20,
        Level::INFO => 30,
        Level::WARN => 40,
        Level::ERROR => 50,
    }
}

fn redact_path(value: &mut Value, path: &[String]) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = value;
    for segment in parents {
        match current.get_mut(segment.as_str()) {
            Some(next) => current = next,
            None => return,
        }
    }

    if let Some(target) = current.get_mut(last.as_str()) {
        *target = Value::from(REDACTED);
    }
}
