//! Pipeline events rendered as tracing output.

use std::time::Duration;
use toolflow_application::{BackendError, PipelineEventNotifier};
use toolflow_domain::{CircuitState, ExecutionId, ExecutionStatus, ToolResult};
use tracing::{debug, info, warn};

pub struct LogEvents;

impl PipelineEventNotifier for LogEvents {
    fn on_execution_status(&self, id: &ExecutionId, status: ExecutionStatus) {
        debug!(execution_id = %id, status = %status, "Execution status");
    }

    fn on_planning_failed(&self, id: &ExecutionId, reason: &str) {
        warn!(execution_id = %id, reason, "Planning failed");
    }

    fn on_step_start(&self, trace_id: &str, index: usize, tool: &str) {
        info!(trace_id, step = index + 1, tool, "Step started");
    }

    fn on_step_complete(&self, trace_id: &str, index: usize, result: &ToolResult) {
        info!(
            trace_id,
            step = index + 1,
            tool = %result.tool,
            success = result.success,
            latency_ms = result.latency_ms,
            "Step finished"
        );
    }

    fn on_retry(&self, backend: &str, attempt: u32, delay: Duration, error: &BackendError) {
        warn!(
            backend,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Retrying model call: {}",
            error
        );
    }

    fn on_circuit_transition(&self, backend: &str, from: CircuitState, to: CircuitState) {
        warn!(backend, from = %from, to = %to, "Circuit breaker transition");
    }
}
