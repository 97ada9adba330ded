//! Pipeline domain: executions, priorities and aggregated results.

pub mod entities;
pub mod value_objects;

pub use entities::{ExecutionId, ExecutionStatus, PipelineExecution, Priority};
pub use value_objects::{PLANNING_FAILED, PipelineMetadata, PipelineMetrics, PipelineResult};
