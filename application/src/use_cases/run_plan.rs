//! Plan execution use case.
//!
//! [`PlanExecutor`] is the only code path that performs tool side effects.
//! It runs validated plan steps through the policy gate and the per-step
//! isolation boundary:
//!
//! ```text
//! step ─▶ lookup ─▶ allowlist ─▶ scope ─▶ rate limit ─▶ elevated auth
//!      ─▶ argument schema ─▶ path guard ─▶ handler (timeout + panic capture)
//! ```
//!
//! Every step yields exactly one [`ToolResult`]; nothing a handler does can
//! abort the remaining steps or escape `run_plan`.

use futures::FutureExt;
use futures::future::join_all;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use toolflow_domain::plan::PlanStep;
use toolflow_domain::tool::path_guard::resolve_within;
use toolflow_domain::tool::{
    DefaultToolValidator, ExecutionContext, RateLimiter, ToolDefinition, ToolError, ToolResult,
    ToolValidator,
};
use tracing::{debug, info, warn};

use crate::config::ExecutorParams;
use crate::ports::audit_sink::{AuditRecord, AuditSink, NoAuditSink};
use crate::ports::elevated_auth::{DenyElevated, ElevatedAuthVerifier};
use crate::ports::events::{NoPipelineEvents, PipelineEventNotifier};
use crate::ports::tool_handler::ToolHandler;
use crate::registry::ToolRegistry;

/// Per-run options supplied by the trusted caller.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub session_id: String,
    pub allowlist: Option<HashSet<String>>,
    pub scopes: Vec<String>,
    pub elevated_proof: Option<String>,
    /// Overrides [`ExecutorParams::stop_on_failure`] for this run
    pub stop_on_failure: Option<bool>,
}

impl RunOptions {
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_allowlist<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowlist = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_elevated_proof(mut self, proof: impl Into<String>) -> Self {
        self.elevated_proof = Some(proof.into());
        self
    }

    pub fn with_stop_on_failure(mut self, stop: bool) -> Self {
        self.stop_on_failure = Some(stop);
        self
    }
}

pub struct PlanExecutor {
    registry: Arc<ToolRegistry>,
    params: ExecutorParams,
    rate_limits: Arc<RateLimiter>,
    validator: Arc<dyn ToolValidator + Send + Sync>,
    auth: Arc<dyn ElevatedAuthVerifier>,
    audit: Arc<dyn AuditSink>,
    events: Arc<dyn PipelineEventNotifier>,
}

impl PlanExecutor {
    pub fn new(registry: Arc<ToolRegistry>, params: ExecutorParams) -> Self {
        let rate_limits = Arc::new(RateLimiter::per_minute(params.rate_limit_per_minute));
        Self {
            registry,
            params,
            rate_limits,
            validator: Arc::new(DefaultToolValidator),
            auth: Arc::new(DenyElevated),
            audit: Arc::new(NoAuditSink),
            events: Arc::new(NoPipelineEvents),
        }
    }

    pub fn with_auth_verifier(mut self, auth: Arc<dyn ElevatedAuthVerifier>) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn PipelineEventNotifier>) -> Self {
        self.events = events;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn ToolValidator + Send + Sync>) -> Self {
        self.validator = validator;
        self
    }

    /// Share a rate limiter with another executor.
    pub fn with_rate_limiter(mut self, rate_limits: Arc<RateLimiter>) -> Self {
        self.rate_limits = rate_limits;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn params(&self) -> &ExecutorParams {
        &self.params
    }

    /// Build the context for one run.
    pub fn build_context(&self, trace_id: &str, options: &RunOptions) -> ExecutionContext {
        let working_dir = self
            .params
            .working_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        let mut ctx = ExecutionContext::new(trace_id, working_dir, Arc::clone(&self.rate_limits))
            .with_session(options.session_id.clone())
            .with_scopes(options.scopes.clone());
        ctx.allowlist = options.allowlist.clone();
        ctx.elevated_proof = options.elevated_proof.clone();
        ctx
    }

    /// Run steps sequentially with default options.
    pub async fn run_plan(&self, steps: &[PlanStep], trace_id: &str) -> Vec<ToolResult> {
        self.run_plan_with(steps, trace_id, &RunOptions::default(), &CancellationToken::new())
            .await
    }

    /// Run steps sequentially.
    ///
    /// Returns exactly one result per step, in step order. After cancellation
    /// the remaining steps are reported as cancelled; with stop-on-failure
    /// they are reported as skipped.
    pub async fn run_plan_with(
        &self,
        steps: &[PlanStep],
        trace_id: &str,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> Vec<ToolResult> {
        let ctx = self.build_context(trace_id, options);
        let stop_on_failure = options
            .stop_on_failure
            .unwrap_or(self.params.stop_on_failure);

        info!(trace_id, steps = steps.len(), "Running plan");

        let mut results = Vec::with_capacity(steps.len());
        let mut halted: Option<ToolError> = None;

        for (index, step) in steps.iter().enumerate() {
            if halted.is_none() && cancel.is_cancelled() {
                halted = Some(ToolError::cancelled());
            }
            if let Some(reason) = &halted {
                results.push(
                    ToolResult::failure(step.tool(), reason.clone()).with_step(index, trace_id),
                );
                continue;
            }

            let result = self.execute_step(index, step, &ctx, cancel).await;
            if stop_on_failure && !result.is_success() {
                debug!(trace_id, index, "Stopping after failed step");
                halted = Some(ToolError::skipped());
            }
            results.push(result);
        }

        results
    }

    /// Run steps concurrently. Steps must not depend on each other's output.
    ///
    /// Results are still returned in step order.
    pub async fn run_plan_parallel(
        &self,
        steps: &[PlanStep],
        trace_id: &str,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> Vec<ToolResult> {
        let ctx = self.build_context(trace_id, options);
        info!(trace_id, steps = steps.len(), "Running plan in parallel");

        join_all(
            steps
                .iter()
                .enumerate()
                .map(|(index, step)| self.execute_step(index, step, &ctx, cancel)),
        )
        .await
    }

    async fn execute_step(
        &self,
        index: usize,
        step: &PlanStep,
        ctx: &ExecutionContext,
        cancel: &CancellationToken,
    ) -> ToolResult {
        let tool = step.tool();
        self.events.on_step_start(&ctx.trace_id, index, tool);

        let start = Instant::now();
        let outcome = self.dispatch(step, ctx, cancel).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(output) => ToolResult::success(tool, output),
            Err(error) => {
                warn!(
                    trace_id = %ctx.trace_id,
                    index,
                    tool,
                    code = %error.code,
                    "Step failed: {}",
                    error.message
                );
                ToolResult::failure(tool, error)
            }
        }
        .with_latency(latency_ms)
        .with_step(index, ctx.trace_id.clone());

        debug!(
            trace_id = %ctx.trace_id,
            index,
            tool,
            success = result.success,
            latency_ms,
            "Step finished"
        );

        self.audit.record(audit_record(step, ctx, &result));
        self.events.on_step_complete(&ctx.trace_id, index, &result);
        result
    }

    /// Policy gate followed by the isolated handler call.
    async fn dispatch(
        &self,
        step: &PlanStep,
        ctx: &ExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<Value, ToolError> {
        let tool = step.tool();
        let (definition, handler) = self.registry.get(tool).ok_or_else(ToolError::unknown_tool)?;

        if !ctx.is_allowed(tool) || !ctx.scope_permits(&definition.allowed_scopes) {
            return Err(ToolError::not_allowed(tool));
        }
        if !ctx.rate_limits.try_acquire(tool) {
            return Err(ToolError::rate_limited());
        }
        if definition.requires_elevated_auth {
            let verified = ctx
                .elevated_proof
                .as_deref()
                .is_some_and(|proof| self.auth.verify(tool, proof, ctx));
            if !verified {
                return Err(ToolError::elevated_auth_required());
            }
        }

        let args = self
            .validator
            .validate(step.args(), definition)
            .map_err(ToolError::invalid_argument)?;
        check_paths(definition, &args, ctx)?;

        self.invoke_isolated(definition, handler.as_ref(), &args, ctx, cancel)
            .await
    }

    async fn invoke_isolated(
        &self,
        definition: &ToolDefinition,
        handler: &dyn ToolHandler,
        args: &Map<String, Value>,
        ctx: &ExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<Value, ToolError> {
        let timeout = self.params.timeout_for(definition.execution_class);
        let call = AssertUnwindSafe(handler.invoke(args, ctx)).catch_unwind();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ToolError::cancelled()),
            outcome = tokio::time::timeout(timeout, call) => match outcome {
                Err(_) => Err(ToolError::timeout(timeout.as_millis() as u64)),
                Ok(Err(panic)) => Err(ToolError::panicked(format!(
                    "Tool '{}' panicked: {}",
                    definition.name,
                    panic_message(panic.as_ref())
                ))),
                Ok(Ok(result)) => result,
            },
        }
    }
}

/// Reject traversal in every declared path argument before the handler runs.
fn check_paths(
    definition: &ToolDefinition,
    args: &Map<String, Value>,
    ctx: &ExecutionContext,
) -> Result<(), ToolError> {
    for param in definition.path_parameters() {
        if let Some(Value::String(path)) = args.get(&param.name) {
            resolve_within(ctx.working_directory(), path)?;
        }
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn audit_record(step: &PlanStep, ctx: &ExecutionContext, result: &ToolResult) -> AuditRecord {
    AuditRecord {
        id: uuid::Uuid::new_v4().to_string(),
        tool: step.tool().to_string(),
        input: step.args().clone(),
        output: result.output.clone(),
        error: result.error.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        session_id: ctx.session_id.clone(),
        trace_id: ctx.trace_id.clone(),
        latency_ms: result.latency_ms,
        success: result.success,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::tool_handler::handler_fn;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use toolflow_domain::tool::{ExecutionClass, ParamType, ToolErrorCode, ToolParameter};

    // ==================== Test Doubles ====================

    #[derive(Default)]
    struct RecordingAudit {
        records: Mutex<Vec<AuditRecord>>,
    }

    impl AuditSink for RecordingAudit {
        fn record(&self, record: AuditRecord) {
            self.records.lock().unwrap().push(record);
        }
    }

    struct AcceptProof(&'static str);

    impl ElevatedAuthVerifier for AcceptProof {
        fn verify(&self, _tool: &str, proof: &str, _ctx: &ExecutionContext) -> bool {
            proof == self.0
        }
    }

    fn echo_tool() -> (ToolDefinition, Arc<dyn ToolHandler>) {
        (
            ToolDefinition::new("echo", "Echo text")
                .with_parameter(ToolParameter::new("text", "Text", true)),
            handler_fn(|args, _| async move { Ok(args["text"].clone()) }),
        )
    }

    fn failing_tool() -> (ToolDefinition, Arc<dyn ToolHandler>) {
        (
            ToolDefinition::new("fail", "Always fails"),
            handler_fn(|_, _| async { Err(ToolError::execution_failed("boom")) }),
        )
    }

    fn registry(tools: Vec<(ToolDefinition, Arc<dyn ToolHandler>)>) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        for (def, handler) in tools {
            registry.register(def, handler).unwrap();
        }
        Arc::new(registry)
    }

    fn executor(tools: Vec<(ToolDefinition, Arc<dyn ToolHandler>)>) -> PlanExecutor {
        PlanExecutor::new(
            registry(tools),
            ExecutorParams::default().with_working_dir("/work"),
        )
    }

    fn step(tool: &str, args: Value) -> PlanStep {
        PlanStep::new(tool, args)
    }

    // ==================== Ordering / Isolation ====================

    #[tokio::test]
    async fn returns_one_result_per_step_in_order() {
        let exec = executor(vec![echo_tool(), failing_tool()]);
        let steps = vec![
            step("echo", json!({"text": "a"})),
            step("missing_tool", json!({})),
            step("fail", json!({})),
            step("echo", json!({"text": "b"})),
        ];

        let results = exec.run_plan(&steps, "trace-1").await;

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].output(), Some(&json!("a")));
        assert_eq!(results[1].error(), Some("Unknown tool"));
        assert_eq!(results[1].error_code(), Some(ToolErrorCode::UnknownTool));
        assert_eq!(results[2].error_code(), Some(ToolErrorCode::ExecutionFailed));
        assert_eq!(results[3].output(), Some(&json!("b")));
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.tool, steps[i].tool());
            assert_eq!(r.metadata.as_ref().unwrap().step_index, i);
        }
    }

    #[tokio::test]
    async fn panicking_handler_becomes_failed_result() {
        let exec = executor(vec![
            (
                ToolDefinition::new("explode", "Panics"),
                handler_fn(|_, _| async { panic!("kaboom") }),
            ),
            echo_tool(),
        ]);
        let results = exec
            .run_plan(
                &[step("explode", json!({})), step("echo", json!({"text": "ok"}))],
                "t",
            )
            .await;

        assert_eq!(results[0].error_code(), Some(ToolErrorCode::Panicked));
        assert!(results[0].error().unwrap().contains("kaboom"));
        assert!(results[1].is_success());
    }

    #[tokio::test]
    async fn slow_handler_times_out() {
        let slow = (
            ToolDefinition::new("slow", "Sleeps"),
            handler_fn(|_, _| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(json!(null))
            }),
        );
        let exec = PlanExecutor::new(
            registry(vec![slow]),
            ExecutorParams::default().with_interactive_timeout(Duration::from_millis(20)),
        );

        let results = exec.run_plan(&[step("slow", json!({}))], "t").await;
        assert_eq!(results[0].error_code(), Some(ToolErrorCode::Timeout));
    }

    #[tokio::test]
    async fn long_running_class_uses_longer_timeout() {
        let tool = (
            ToolDefinition::new("build", "Slow but allowed")
                .with_execution_class(ExecutionClass::LongRunning),
            handler_fn(|_, _| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(json!("built"))
            }),
        );
        let exec = PlanExecutor::new(
            registry(vec![tool]),
            ExecutorParams::default()
                .with_interactive_timeout(Duration::from_millis(10))
                .with_long_running_timeout(Duration::from_secs(5)),
        );

        let results = exec.run_plan(&[step("build", json!({}))], "t").await;
        assert!(results[0].is_success());
    }

    // ==================== Policy ====================

    #[tokio::test]
    async fn allowlist_blocks_other_tools() {
        let exec = executor(vec![echo_tool(), failing_tool()]);
        let options = RunOptions::default().with_allowlist(["fail"]);
        let results = exec
            .run_plan_with(
                &[step("echo", json!({"text": "x"}))],
                "t",
                &options,
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(results[0].error_code(), Some(ToolErrorCode::NotAllowed));
    }

    #[tokio::test]
    async fn rate_limit_stops_handler_invocation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let tool = (
            ToolDefinition::new("count", "Counts"),
            handler_fn(move |_, _| {
                let counted = Arc::clone(&counted);
                async move {
                    counted.fetch_add(1, Ordering::SeqCst);
                    Ok(json!(null))
                }
            }),
        );
        let exec = PlanExecutor::new(registry(vec![tool]), ExecutorParams::default().with_rate_limit(2));

        let steps = vec![step("count", json!({})); 3];
        let results = exec.run_plan(&steps, "t").await;

        assert!(results[0].is_success());
        assert!(results[1].is_success());
        assert_eq!(results[2].error(), Some("Rate limit exceeded"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rate_limit_is_shared_across_runs() {
        let exec = PlanExecutor::new(
            registry(vec![echo_tool()]),
            ExecutorParams::default().with_rate_limit(1),
        );
        let s = [step("echo", json!({"text": "x"}))];
        assert!(exec.run_plan(&s, "run-1").await[0].is_success());
        assert_eq!(
            exec.run_plan(&s, "run-2").await[0].error_code(),
            Some(ToolErrorCode::RateLimited)
        );
    }

    #[tokio::test]
    async fn elevated_tool_requires_valid_proof() {
        let tool = (
            ToolDefinition::new("danger", "Needs proof").with_elevated_auth(),
            handler_fn(|_, _| async { Ok(json!("done")) }),
        );
        let exec = executor(vec![tool]).with_auth_verifier(Arc::new(AcceptProof("123456")));
        let cancel = CancellationToken::new();
        let s = [step("danger", json!({}))];

        let none = exec.run_plan(&s, "t").await;
        assert_eq!(none[0].error_code(), Some(ToolErrorCode::ElevatedAuthRequired));

        let wrong = RunOptions::default().with_elevated_proof("000000");
        let bad = exec.run_plan_with(&s, "t", &wrong, &cancel).await;
        assert_eq!(bad[0].error_code(), Some(ToolErrorCode::ElevatedAuthRequired));

        let right = RunOptions::default().with_elevated_proof("123456");
        let ok = exec.run_plan_with(&s, "t", &right, &cancel).await;
        assert!(ok[0].is_success());
    }

    #[tokio::test]
    async fn default_verifier_denies_elevated_tools() {
        let tool = (
            ToolDefinition::new("danger", "Needs proof").with_elevated_auth(),
            handler_fn(|_, _| async { Ok(json!("done")) }),
        );
        let exec = executor(vec![tool]);
        let options = RunOptions::default().with_elevated_proof("anything");
        let results = exec
            .run_plan_with(&[step("danger", json!({}))], "t", &options, &CancellationToken::new())
            .await;
        assert_eq!(results[0].error_code(), Some(ToolErrorCode::ElevatedAuthRequired));
    }

    #[tokio::test]
    async fn scopes_restrict_tools() {
        let tool = (
            ToolDefinition::new("net", "Network").with_scope("net"),
            handler_fn(|_, _| async { Ok(json!(null)) }),
        );
        let exec = executor(vec![tool]);
        let options = RunOptions::default().with_scopes(vec!["fs".into()]);
        let results = exec
            .run_plan_with(&[step("net", json!({}))], "t", &options, &CancellationToken::new())
            .await;
        assert_eq!(results[0].error_code(), Some(ToolErrorCode::NotAllowed));
    }

    #[tokio::test]
    async fn schema_violations_are_invalid_arguments() {
        let exec = executor(vec![echo_tool()]);
        let results = exec
            .run_plan(
                &[
                    step("echo", json!({})),
                    step("echo", json!({"text": "a", "extra": 1})),
                    step("echo", json!("not an object")),
                ],
                "t",
            )
            .await;
        for r in &results {
            assert_eq!(r.error_code(), Some(ToolErrorCode::InvalidArgument));
        }
    }

    #[tokio::test]
    async fn traversal_in_path_argument_is_rejected_before_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let tool = (
            ToolDefinition::new("read", "Read")
                .with_parameter(ToolParameter::new("path", "Path", true).with_type(ParamType::Path)),
            handler_fn(move |_, _| {
                let counted = Arc::clone(&counted);
                async move {
                    counted.fetch_add(1, Ordering::SeqCst);
                    Ok(json!(null))
                }
            }),
        );
        let exec = executor(vec![tool]);
        let results = exec
            .run_plan(&[step("read", json!({"path": "../etc/passwd"}))], "t")
            .await;

        assert_eq!(results[0].error_code(), Some(ToolErrorCode::PathTraversal));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    // ==================== Failure Policy / Cancellation ====================

    #[tokio::test]
    async fn stop_on_failure_skips_remaining_steps() {
        let exec = executor(vec![echo_tool(), failing_tool()]);
        let options = RunOptions::default().with_stop_on_failure(true);
        let results = exec
            .run_plan_with(
                &[
                    step("echo", json!({"text": "a"})),
                    step("fail", json!({})),
                    step("echo", json!({"text": "b"})),
                ],
                "t",
                &options,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_success());
        assert_eq!(results[1].error_code(), Some(ToolErrorCode::ExecutionFailed));
        assert_eq!(results[2].error_code(), Some(ToolErrorCode::Skipped));
    }

    #[tokio::test]
    async fn cancelled_run_reports_remaining_steps_cancelled() {
        let exec = executor(vec![echo_tool()]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let results = exec
            .run_plan_with(
                &[step("echo", json!({"text": "a"})), step("echo", json!({"text": "b"}))],
                "t",
                &RunOptions::default(),
                &cancel,
            )
            .await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.error_code() == Some(ToolErrorCode::Cancelled)));
    }

    #[tokio::test]
    async fn cancellation_aborts_in_flight_handler() {
        let tool = (
            ToolDefinition::new("wait", "Waits").with_execution_class(ExecutionClass::LongRunning),
            handler_fn(|_, _| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(json!(null))
            }),
        );
        let exec = executor(vec![tool]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let results = exec
            .run_plan_with(&[step("wait", json!({}))], "t", &RunOptions::default(), &cancel)
            .await;
        assert_eq!(results[0].error_code(), Some(ToolErrorCode::Cancelled));
    }

    #[tokio::test]
    async fn parallel_mode_keeps_step_order() {
        let tool = (
            ToolDefinition::new("delay", "Sleeps then echoes").with_parameter(
                ToolParameter::new("ms", "Delay", true).with_type(ParamType::Integer),
            ),
            handler_fn(|args, _| async move {
                let ms = args["ms"].as_u64().unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(json!(ms))
            }),
        );
        let exec = executor(vec![tool]);
        let steps = vec![
            step("delay", json!({"ms": 60})),
            step("delay", json!({"ms": 1})),
            step("delay", json!({"ms": 30})),
        ];

        let results = exec
            .run_plan_parallel(&steps, "t", &RunOptions::default(), &CancellationToken::new())
            .await;
        let outputs: Vec<_> = results.iter().map(|r| r.output().cloned()).collect();
        assert_eq!(outputs, [Some(json!(60)), Some(json!(1)), Some(json!(30))]);
    }

    // ==================== Audit ====================

    #[tokio::test]
    async fn writes_one_audit_record_per_step() {
        let audit = Arc::new(RecordingAudit::default());
        let exec = executor(vec![echo_tool()]).with_audit_sink(audit.clone());
        let options = RunOptions::default().with_session("session-9");

        exec.run_plan_with(
            &[step("echo", json!({"text": "hi"})), step("nope", json!({}))],
            "trace-7",
            &options,
            &CancellationToken::new(),
        )
        .await;

        let records = audit.records.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tool, "echo");
        assert_eq!(records[0].input, json!({"text": "hi"}));
        assert_eq!(records[0].output, Some(json!("hi")));
        assert_eq!(records[0].session_id, "session-9");
        assert_eq!(records[0].trace_id, "trace-7");
        assert!(records[0].success);
        assert_eq!(records[1].error.as_deref(), Some("Unknown tool"));
        assert_ne!(records[0].id, records[1].id);
    }
}
