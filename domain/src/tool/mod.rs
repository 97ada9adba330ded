//! Tool domain module
//!
//! Defines how the pipeline describes, validates and reports on tools: the
//! named side-effecting operations a plan step may reference.
//!
//! ```text
//! ┌────────────────┐    ┌──────────────────┐    ┌──────────────┐
//! │ ToolDefinition │───▶│ ExecutionContext │───▶│ ToolResult   │
//! │ (schema)       │    │ (per plan run)   │    │ (per step)   │
//! └────────────────┘    └──────────────────┘    └──────────────┘
//! ```
//!
//! # Policy surface
//!
//! Before a handler is invoked the executor consults, in order: the context
//! allowlist, the shared [`RateLimiter`], the elevated-auth flag on the
//! definition, the scope list, and finally the [`ToolValidator`] for the
//! argument schema. Path parameters go through [`path_guard`].
//!
//! # Architecture
//!
//! - **Domain** (this module): definitions, results, validation, no I/O
//! - **Application** (`ToolHandler` port, `ToolRegistry`, `PlanExecutor`)
//! - **Infrastructure**: concrete file, command and fetch handlers

pub mod context;
pub mod entities;
pub mod path_guard;
pub mod rate_limit;
pub mod traits;
pub mod value_objects;

pub use context::ExecutionContext;
pub use entities::{ExecutionClass, ParamType, ToolDefinition, ToolParameter, ToolSpec};
pub use rate_limit::RateLimiter;
pub use traits::{DefaultToolValidator, ToolValidator};
pub use value_objects::{ToolError, ToolErrorCode, ToolResult, ToolResultMetadata};
