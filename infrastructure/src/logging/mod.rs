//! Logging infrastructure: the tool-invocation audit trail.
//!
//! Provides [`JsonlAuditSink`], a JSONL file writer that implements
//! the [`AuditSink`](toolflow_application::AuditSink) port.

mod jsonl_audit;

pub use jsonl_audit::JsonlAuditSink;
