//! Application layer for toolflow
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod registry;
pub mod scheduler;
pub mod use_cases;

// Re-export commonly used types
pub use config::{ExecutorParams, PipelineParams, RouterParams};
pub use ports::{
    audit_sink::{AuditRecord, AuditSink, NoAuditSink},
    elevated_auth::{DenyElevated, ElevatedAuthVerifier},
    events::{NoPipelineEvents, PipelineEventNotifier},
    model_backend::{BackendError, ModelBackend},
    tool_handler::{ToolHandler, handler_fn},
};
pub use registry::ToolRegistry;
pub use scheduler::{AdmissionError, AdmissionQueue};
pub use use_cases::route_completion::{BackendFailure, ModelRouter, RouterError};
pub use use_cases::run_plan::{PlanExecutor, RunOptions};
pub use use_cases::submit_request::{
    PipelineError, PipelineService, SubmitOptions, SubmitOutcome,
};
