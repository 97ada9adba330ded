//! Pipeline event port.
//!
//! [`PipelineEventNotifier`] is an **output port** for observers that want
//! to follow the pipeline as it runs: execution status changes, step
//! progress, retries and circuit transitions.
//!
//! Notifications are delivered synchronously at the point where the change
//! happens, so an observer sees them in the order they occurred.
//!
//! All methods have default no-op implementations, so implementers only
//! need to override the callbacks they care about.

use std::time::Duration;
use toolflow_domain::{CircuitState, ExecutionId, ExecutionStatus, ToolResult};

use super::model_backend::BackendError;

pub trait PipelineEventNotifier: Send + Sync {
    /// Called whenever an execution changes status
    fn on_execution_status(&self, _id: &ExecutionId, _status: ExecutionStatus) {}

    /// Called when planning fails and the submission will not execute
    fn on_planning_failed(&self, _id: &ExecutionId, _reason: &str) {}

    /// Called before a plan step is dispatched
    fn on_step_start(&self, _trace_id: &str, _index: usize, _tool: &str) {}

    /// Called after a plan step produced its result
    fn on_step_complete(&self, _trace_id: &str, _index: usize, _result: &ToolResult) {}

    /// Called before the router sleeps for a retry
    fn on_retry(&self, _backend: &str, _attempt: u32, _delay: Duration, _error: &BackendError) {}

    /// Called on every breaker state change
    fn on_circuit_transition(&self, _backend: &str, _from: CircuitState, _to: CircuitState) {}
}

/// No-op notifier.
pub struct NoPipelineEvents;

impl PipelineEventNotifier for NoPipelineEvents {}
