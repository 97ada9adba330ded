//! Domain layer for toolflow
//!
//! Pure types and logic for the tool-use orchestration pipeline. No I/O, no
//! async runtime; everything here can be unit-tested in isolation.
//!
//! # Core Concepts
//!
//! ## Plans
//!
//! Model output is untrusted. [`parse_plan`] turns raw text into a validated
//! [`ToolPlan`] or nothing at all; there is no fallback action.
//!
//! ## Tools
//!
//! A [`ToolDefinition`] describes a named operation and its parameter schema.
//! Each executed step yields exactly one [`ToolResult`].
//!
//! ## Routing
//!
//! Each model backend is guarded by a [`CircuitBreaker`]; usage is priced
//! with [`CostRates`] and summed in [`RouterMetrics`].
//!
//! ## Pipeline
//!
//! A submission becomes a [`PipelineExecution`] with a [`Priority`] and ends
//! with a [`PipelineResult`].

pub mod config;
pub mod core;
pub mod pipeline;
pub mod plan;
pub mod prompt;
pub mod router;
pub mod tool;
pub mod util;

pub use config::{ConfigIssue, ConfigIssueCode, Severity, has_errors};
pub use core::error::DomainError;
pub use pipeline::{
    ExecutionId, ExecutionStatus, PipelineExecution, PipelineMetadata, PipelineMetrics,
    PipelineResult, Priority,
};
pub use plan::{PlanStep, ToolPlan, empty_plan, parse_plan, sanitize_tool_name};
pub use prompt::PlanningPromptTemplate;
pub use router::{
    CircuitBreaker, CircuitState, Completion, CompletionOptions, CostRates, RoutedCompletion,
    RouterMetrics,
};
pub use tool::{
    DefaultToolValidator, ExecutionClass, ExecutionContext, ParamType, RateLimiter,
    ToolDefinition, ToolError, ToolErrorCode, ToolParameter, ToolResult, ToolResultMetadata,
    ToolSpec, ToolValidator,
};
