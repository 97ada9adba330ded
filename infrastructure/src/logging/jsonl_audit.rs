//! JSONL file writer for audit records.
//!
//! Each [`AuditRecord`] is serialized as a single JSON line and appended to
//! the file via a buffered writer.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use toolflow_application::{AuditRecord, AuditSink};
use tracing::warn;

/// Append-only audit log, one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes after every record and
/// on `Drop`.
pub struct JsonlAuditSink {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlAuditSink {
    /// Open (or create) the audit log at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, record: AuditRecord) {
        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                warn!(tool = %record.tool, "Could not serialize audit record: {}", e);
                return;
            }
        };

        let mut writer = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        let written = writeln!(writer, "{}", line).and_then(|_| writer.flush());
        if let Err(e) = written {
            warn!(path = %self.path.display(), "Could not write audit record: {}", e);
        }
    }
}

impl Drop for JsonlAuditSink {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(tool: &str, success: bool) -> AuditRecord {
        AuditRecord {
            id: "rec-1".into(),
            tool: tool.into(),
            input: json!({"path": "notes.txt"}),
            output: success.then(|| json!("buy milk")),
            error: (!success).then(|| "File not found: notes.txt".to_string()),
            timestamp: chrono::Utc::now().to_rfc3339(),
            session_id: "session".into(),
            trace_id: "trace".into(),
            latency_ms: 3,
            success,
        }
    }

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = JsonlAuditSink::open(&path).unwrap();

        sink.record(record("read_file", true));
        sink.record(record("read_file", false));
        drop(sink);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["tool"], "read_file");
        assert_eq!(lines[0]["output"], "buy milk");
        assert!(lines[0].get("error").is_none());
        assert_eq!(lines[1]["success"], false);
        assert!(lines[1].get("output").is_none());
        assert_eq!(lines[1]["trace_id"], "trace");
    }

    #[test]
    fn test_appends_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/audit.jsonl");

        JsonlAuditSink::open(&path).unwrap().record(record("a", true));
        JsonlAuditSink::open(&path).unwrap().record(record("b", true));

        let tools: Vec<_> = read_lines(&path)
            .into_iter()
            .map(|v| v["tool"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(tools, ["a", "b"]);
    }
}
