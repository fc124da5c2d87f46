//! Destinations for the local audit log line.

use std::fmt::Debug;
use std::io::Write;

use parking_lot::Mutex;
use tracing::info;

use crate::layout::AuditLogLine;

/// Destination for audit log lines.
pub trait LogLineSink: Send + Sync + Debug {
    /// Writes one audit line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line cannot be written.
    fn emit(&self, line: &AuditLogLine) -> Result<(), LoggerError>;

    /// Flushes any buffered lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&self) -> Result<(), LoggerError>;

    /// Returns the sink name for identification.
    fn name(&self) -> &'static str;
}

/// Errors that can occur while writing audit lines.
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Serialization error
    #[error("Failed to serialize audit line: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Sink that forwards lines to the process `tracing` subscriber.
///
/// Each line becomes one `INFO` event on target `gdpr` carrying the layout
/// values as event fields, nested under the subscriber's own format. Use
/// [`WriterBackend`] for the flat layout consumed by the log pipeline.
#[derive(Debug, Default)]
pub struct TracingBackend;

impl TracingBackend {
    /// Creates a new tracing sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LogLineSink for TracingBackend {
    fn emit(&self, line: &AuditLogLine) -> Result<(), LoggerError> {
        info!(
            target: "gdpr",
            logger = %line.name,
            "x-hpass-txn-id" = line.transaction_id.as_deref(),
            subject_id = line.subject_id.as_deref(),
            url = line.url.as_deref(),
            "{}",
            line.message
        );
        Ok(())
    }

    fn flush(&self) -> Result<(), LoggerError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}

/// Sink that writes each line as raw JSON followed by a newline.
pub struct WriterBackend {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl Debug for WriterBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterBackend").finish_non_exhaustive()
    }
}

impl WriterBackend {
    /// Creates a sink over any writer.
    #[must_use]
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Creates a sink writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl LogLineSink for WriterBackend {
    fn emit(&self, line: &AuditLogLine) -> Result<(), LoggerError> {
        let json = line.to_json()?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{json}")?;
        Ok(())
    }

    fn flush(&self) -> Result<(), LoggerError> {
        self.writer.lock().flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "writer"
    }
}

/// In-memory sink for testing.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    lines: Mutex<Vec<AuditLogLine>>,
}

impl InMemoryBackend {
    /// Creates a new in-memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all emitted lines.
    #[must_use]
    pub fn lines(&self) -> Vec<AuditLogLine> {
        self.lines.lock().clone()
    }

    /// Clears all emitted lines.
    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl LogLineSink for InMemoryBackend {
    fn emit(&self, line: &AuditLogLine) -> Result<(), LoggerError> {
        self.lines.lock().push(line.clone());
        Ok(())
    }

    fn flush(&self) -> Result<(), LoggerError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use std::sync::Arc;

    /// Writer whose contents stay readable after it is handed to a sink.
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn line(message: &str) -> AuditLogLine {
        AuditLogLine::info("gdpr-logger", message, "subject-1", &RequestContext::new())
    }

    #[test]
    fn test_writer_backend_one_json_object_per_line() {
        let buffer = SharedBuffer::default();
        let sink = WriterBackend::new(buffer.clone());

        sink.emit(&line("GDPR: CREATE")).unwrap();
        sink.emit(&line("GDPR: READ")).unwrap();
        sink.flush().unwrap();

        let output = String::from_utf8(buffer.0.lock().clone()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["message"], "GDPR: CREATE");
        assert_eq!(lines[1]["message"], "GDPR: READ");
    }

    #[test]
    fn test_tracing_backend() {
        let sink = TracingBackend::new();

        // Should not panic without a subscriber
        sink.emit(&line("GDPR: UPDATE")).unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.name(), "tracing");
    }

    #[test]
    fn test_in_memory_backend_clear() {
        let sink = InMemoryBackend::new();
        sink.emit(&line("GDPR: DELETE")).unwrap();
        assert_eq!(sink.lines().len(), 1);

        sink.clear();
        assert!(sink.lines().is_empty());
    }
}
