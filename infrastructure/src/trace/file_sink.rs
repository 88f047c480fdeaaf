//! File-backed trace sink
//!
//! Writes every prompt/grammar/generated-text exchange to a
//! human-readable log for offline inspection. Write failures are logged
//! and swallowed; tracing must never fail the run.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use gramcall_application::ports::trace_sink::{TraceRecord, TraceSink};
use tracing::warn;

const SEPARATOR: &str =
    "================================================================================";

/// Append-only trace log on disk.
pub struct FileTraceSink {
    file: Mutex<File>,
}

impl FileTraceSink {
    /// Create (or truncate) the trace file and write the header.
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let mut file = File::create(path)?;
        writeln!(file, "=== GRAMCALL AGENT TRACE ===")?;
        writeln!(file)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    fn write_record(&self, record: &TraceRecord) -> std::io::Result<()> {
        let mut file = self.file.lock().expect("trace file lock");
        writeln!(file)?;
        writeln!(file, "{}", SEPARATOR)?;
        writeln!(
            file,
            "[{}] PROMPT <{}> (length={}):",
            chrono::Local::now().format("%H:%M:%S"),
            record.label,
            record.prompt.len()
        )?;
        writeln!(file, "{}", SEPARATOR)?;
        writeln!(file, "{}", record.prompt)?;
        writeln!(file, "{}", SEPARATOR)?;
        if let Some(grammar) = &record.grammar {
            writeln!(file, "GRAMMAR:")?;
            writeln!(file, "{}", grammar)?;
            writeln!(file, "{}", SEPARATOR)?;
        }
        writeln!(file, "GENERATED:")?;
        writeln!(file, "{}", record.generated)?;
        writeln!(file, "{}", SEPARATOR)?;
        Ok(())
    }
}

impl TraceSink for FileTraceSink {
    fn record(&self, record: &TraceRecord) {
        if let Err(e) = self.write_record(record) {
            warn!(error = %e, "Failed to write trace record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_appended_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.log");

        let sink = FileTraceSink::create(&path).unwrap();
        sink.record(&TraceRecord {
            label: "select_tool".to_string(),
            prompt: "pick one".to_string(),
            grammar: Some("root ::= \"filter\"".to_string()),
            generated: "filter".to_string(),
        });
        sink.record(&TraceRecord {
            label: "param:column".to_string(),
            prompt: "which column".to_string(),
            grammar: None,
            generated: "a".to_string(),
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("=== GRAMCALL AGENT TRACE ==="));
        assert!(contents.contains("PROMPT <select_tool>"));
        assert!(contents.contains("root ::= \"filter\""));
        let select = contents.find("select_tool").unwrap();
        let column = contents.find("param:column").unwrap();
        assert!(select < column);
    }
}
