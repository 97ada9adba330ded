//! Port for the per-invocation audit trail.
//!
//! Every executed plan step produces exactly one [`AuditRecord`]. This is
//! separate from `tracing` output: tracing carries diagnostics, the audit
//! sink carries a machine-readable record of what ran with which input.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub id: String,
    pub tool: String,
    pub input: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// RFC 3339, UTC
    pub timestamp: String,
    pub session_id: String,
    pub trace_id: String,
    pub latency_ms: u64,
    pub success: bool,
}

/// Sink for audit records.
///
/// `record` is synchronous and infallible so that auditing can never fail a
/// step; implementations swallow their own write errors.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}

/// No-op sink for tests and when auditing is disabled.
pub struct NoAuditSink;

impl AuditSink for NoAuditSink {
    fn record(&self, _record: AuditRecord) {}
}
