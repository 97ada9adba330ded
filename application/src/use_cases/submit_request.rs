//! Pipeline submission use case.
//!
//! [`PipelineService`] ties the pieces together:
//!
//! ```text
//! submit_request ─▶ admission queue ─▶ planning prompt ─▶ ModelRouter
//!                                   ─▶ parse_plan ─▶ PlanExecutor ─▶ PipelineResult
//! ```
//!
//! When planning fails, whether the backend is down or the response holds
//! no valid plan, the submission fails with "Tool planning failed" and no
//! step runs. Model text only reaches the executor through `parse_plan`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use toolflow_domain::plan::{PlanStep, ToolPlan, parse_plan};
use toolflow_domain::prompt::PlanningPromptTemplate;
use toolflow_domain::{
    ExecutionId, ExecutionStatus, PipelineExecution, PipelineMetrics, PipelineResult, Priority,
    ToolResult,
};
use tracing::{debug, info, warn};

use crate::config::PipelineParams;
use crate::ports::events::{NoPipelineEvents, PipelineEventNotifier};
use crate::scheduler::{AdmissionError, AdmissionQueue, Permit, Ticket};
use crate::use_cases::route_completion::ModelRouter;
use crate::use_cases::run_plan::{PlanExecutor, RunOptions};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Pipeline queue is full ({max_queued} executions waiting)")]
    QueueFull { max_queued: usize },

    #[error("Pipeline is shutting down")]
    ShuttingDown,
}

impl From<AdmissionError> for PipelineError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::QueueFull { max_queued } => PipelineError::QueueFull { max_queued },
            AdmissionError::Closed => PipelineError::ShuttingDown,
        }
    }
}

/// Caller-supplied options for one submission.
///
/// Elevated-auth proof travels here, from the trusted submitter. It is never
/// read from plan arguments.
#[derive(Debug, Clone)]
pub struct SubmitOptions {
    pub session_id: Option<String>,
    pub priority: Priority,
    /// Wait for the result (`true`) or return the execution id immediately.
    pub wait_for_completion: bool,
    pub allowlist: Option<Vec<String>>,
    pub scopes: Vec<String>,
    pub elevated_proof: Option<String>,
    /// Overrides [`PipelineParams::best_effort`]
    pub best_effort: Option<bool>,
    /// Overrides the executor's stop-on-failure setting
    pub stop_on_failure: Option<bool>,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            session_id: None,
            priority: Priority::Normal,
            wait_for_completion: true,
            allowlist: None,
            scopes: Vec::new(),
            elevated_proof: None,
            best_effort: None,
            stop_on_failure: None,
        }
    }
}

impl SubmitOptions {
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn detached(mut self) -> Self {
        self.wait_for_completion = false;
        self
    }

    pub fn with_allowlist(mut self, tools: Vec<String>) -> Self {
        self.allowlist = Some(tools);
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

    pub fn with_best_effort(mut self, best_effort: bool) -> Self {
        self.best_effort = Some(best_effort);
        self
    }

    pub fn with_stop_on_failure(mut self, stop: bool) -> Self {
        self.stop_on_failure = Some(stop);
        self
    }
}

/// What `submit_*` hands back.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// `wait_for_completion` was set; the execution has finished.
    Completed(PipelineResult),
    /// Detached submission; poll with [`PipelineService::get_execution`].
    Accepted(ExecutionId),
}

impl SubmitOutcome {
    pub fn execution_id(&self) -> &ExecutionId {
        match self {
            SubmitOutcome::Completed(result) => &result.execution_id,
            SubmitOutcome::Accepted(id) => id,
        }
    }

    pub fn into_result(self) -> Option<PipelineResult> {
        match self {
            SubmitOutcome::Completed(result) => Some(result),
            SubmitOutcome::Accepted(_) => None,
        }
    }
}

enum Job {
    /// Natural-language request; goes through the planner
    Request(String),
    /// Trusted, caller-built steps; skips the planner
    Plan(Vec<PlanStep>),
}

struct ExecutionEntry {
    execution: PipelineExecution,
    cancel: CancellationToken,
}

#[derive(Default)]
struct Counters {
    submitted: u64,
    completed: u64,
    failed: u64,
    cancelled: u64,
    rejected: u64,
}

pub struct PipelineService {
    executor: Arc<PlanExecutor>,
    router: Arc<ModelRouter>,
    queue: Arc<AdmissionQueue>,
    params: PipelineParams,
    executions: Mutex<HashMap<ExecutionId, ExecutionEntry>>,
    counters: Mutex<Counters>,
    events: Arc<dyn PipelineEventNotifier>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PipelineService {
    pub fn new(
        executor: Arc<PlanExecutor>,
        router: Arc<ModelRouter>,
        params: PipelineParams,
    ) -> Self {
        let queue = AdmissionQueue::new(params.max_concurrent, params.max_queued);
        Self {
            executor,
            router,
            queue,
            params,
            executions: Mutex::new(HashMap::new()),
            counters: Mutex::new(Counters::default()),
            events: Arc::new(NoPipelineEvents),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn PipelineEventNotifier>) -> Self {
        self.events = events;
        self
    }

    pub fn executor(&self) -> &Arc<PlanExecutor> {
        &self.executor
    }

    pub fn router(&self) -> &Arc<ModelRouter> {
        &self.router
    }

    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    // ==================== Submission ====================

    /// Plan a natural-language request with the model and run the plan.
    pub async fn submit_request(
        self: &Arc<Self>,
        prompt: &str,
        options: SubmitOptions,
    ) -> Result<SubmitOutcome, PipelineError> {
        self.submit(Job::Request(prompt.to_string()), options).await
    }

    /// Run caller-built steps without consulting the planner.
    pub async fn submit_plan(
        self: &Arc<Self>,
        steps: Vec<PlanStep>,
        options: SubmitOptions,
    ) -> Result<SubmitOutcome, PipelineError> {
        self.submit(Job::Plan(steps), options).await
    }

    async fn submit(
        self: &Arc<Self>,
        job: Job,
        options: SubmitOptions,
    ) -> Result<SubmitOutcome, PipelineError> {
        let ticket = match self.queue.admit(options.priority) {
            Ok(ticket) => ticket,
            Err(err) => {
                lock(&self.counters).rejected += 1;
                warn!(priority = %options.priority, "Submission rejected: {}", err);
                return Err(err.into());
            }
        };

        let id = ExecutionId::new(uuid::Uuid::new_v4().to_string());
        let session_id = options
            .session_id
            .clone()
            .unwrap_or_else(|| id.to_string());
        let cancel = CancellationToken::new();

        lock(&self.executions).insert(
            id.clone(),
            ExecutionEntry {
                execution: PipelineExecution::new(id.clone(), session_id, options.priority),
                cancel: cancel.clone(),
            },
        );
        lock(&self.counters).submitted += 1;
        info!(
            execution_id = %id,
            priority = %options.priority,
            queued = ticket.is_waiting(),
            "Execution submitted"
        );
        self.events.on_execution_status(&id, ExecutionStatus::Queued);

        // The execution runs in its own task so that a caller dropping the
        // returned future cannot leave the entry stuck in the table.
        let wait = options.wait_for_completion;
        let service = Arc::clone(self);
        let task_id = id.clone();
        let handle =
            tokio::spawn(async move { service.process(task_id, ticket, job, options, cancel).await });

        if !wait {
            return Ok(SubmitOutcome::Accepted(id));
        }

        match handle.await {
            Ok(result) => Ok(SubmitOutcome::Completed(result)),
            Err(err) => {
                warn!(execution_id = %id, "Execution task aborted: {}", err);
                let result = PipelineResult {
                    success: false,
                    error: Some(format!("Execution aborted: {err}")),
                    ..PipelineResult::from_steps(id.clone(), Vec::new(), false)
                };
                self.finish(&id, result.clone());
                Ok(SubmitOutcome::Completed(result))
            }
        }
    }

    async fn process(
        &self,
        id: ExecutionId,
        ticket: Ticket,
        job: Job,
        options: SubmitOptions,
        cancel: CancellationToken,
    ) -> PipelineResult {
        let permit: Permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(execution_id = %id, "Cancelled while queued");
                return PipelineResult::cancelled(id, Vec::new());
            }
            permit = ticket.acquire() => match permit {
                Ok(permit) => permit,
                Err(err) => {
                    let result = PipelineResult {
                        success: false,
                        error: Some(err.to_string()),
                        ..PipelineResult::from_steps(id.clone(), Vec::new(), false)
                    };
                    self.finish(&id, result.clone());
                    return result;
                }
            },
        };

        if !self.mark_running(&id) {
            return PipelineResult::cancelled(id, Vec::new());
        }

        let started = Instant::now();
        let run_options = self.run_options(&id, &options);
        let best_effort = options.best_effort.unwrap_or(self.params.best_effort);

        let result = match job {
            Job::Request(prompt) => {
                self.plan_and_run(&id, &prompt, &run_options, best_effort, &cancel)
                    .await
            }
            Job::Plan(steps) => {
                let results = self.run_steps(&id, &steps, &run_options, &cancel).await;
                PipelineResult::from_steps(id.clone(), results, best_effort)
            }
        };
        drop(permit);

        let result = if cancel.is_cancelled() {
            PipelineResult::cancelled(id.clone(), result.steps)
        } else {
            result
        };
        let result = result.with_metadata(|m| {
            m.session_id = run_options.session_id.clone();
            m.priority = options.priority;
            m.duration_ms = started.elapsed().as_millis() as u64;
        });

        self.finish(&id, result.clone());
        result
    }

    async fn plan_and_run(
        &self,
        id: &ExecutionId,
        request: &str,
        run_options: &RunOptions,
        best_effort: bool,
        cancel: &CancellationToken,
    ) -> PipelineResult {
        let tools = self.executor.registry().describe();
        let prompt = PlanningPromptTemplate::build(&tools, request);

        let completion = match self
            .router
            .complete_with_cancel(&prompt, &self.params.planning, cancel)
            .await
        {
            Ok(completion) => completion,
            Err(err) => return self.planning_failed(id, &err.to_string()),
        };

        let Some(plan) = parse_plan(&completion.content) else {
            return self
                .planning_failed(id, "model response did not contain a valid plan")
                .with_metadata(|m| {
                    m.planned_by = Some(completion.backend.clone());
                    m.planning_tokens = completion.tokens_used;
                    m.planning_cost = completion.cost;
                });
        };

        info!(
            execution_id = %id,
            steps = plan.steps().len(),
            confidence = plan.confidence(),
            backend = %completion.backend,
            "Plan accepted"
        );

        let results = self.run_steps(id, plan.steps(), run_options, cancel).await;
        PipelineResult::from_steps(id.clone(), results, best_effort).with_metadata(|m| {
            apply_plan_metadata(
                m,
                &plan,
                &completion.backend,
                completion.tokens_used,
                completion.cost,
            )
        })
    }

    async fn run_steps(
        &self,
        id: &ExecutionId,
        steps: &[PlanStep],
        run_options: &RunOptions,
        cancel: &CancellationToken,
    ) -> Vec<ToolResult> {
        if self.params.parallel_steps {
            self.executor
                .run_plan_parallel(steps, id.as_str(), run_options, cancel)
                .await
        } else {
            self.executor
                .run_plan_with(steps, id.as_str(), run_options, cancel)
                .await
        }
    }

    fn planning_failed(&self, id: &ExecutionId, reason: &str) -> PipelineResult {
        warn!(execution_id = %id, reason, "Tool planning failed");
        self.events.on_planning_failed(id, reason);
        PipelineResult::planning_failed(id.clone(), reason)
    }

    fn run_options(&self, id: &ExecutionId, options: &SubmitOptions) -> RunOptions {
        let session_id = lock(&self.executions)
            .get(id)
            .map(|e| e.execution.session_id.clone())
            .unwrap_or_else(|| id.to_string());

        RunOptions {
            session_id,
            allowlist: options
                .allowlist
                .as_ref()
                .map(|tools| tools.iter().cloned().collect()),
            scopes: options.scopes.clone(),
            elevated_proof: options.elevated_proof.clone(),
            stop_on_failure: options.stop_on_failure,
        }
    }

    // ==================== Execution Table ====================

    fn mark_running(&self, id: &ExecutionId) -> bool {
        let running = {
            let mut table = lock(&self.executions);
            match table.get_mut(id) {
                Some(entry) if !entry.execution.is_terminal() => {
                    entry.execution.mark_running();
                    true
                }
                _ => false,
            }
        };
        if running {
            self.events.on_execution_status(id, ExecutionStatus::Running);
        }
        running
    }

    /// Record the result if the execution is still tracked. A cancelled
    /// execution is no longer in the table, so its late result is dropped.
    fn finish(&self, id: &ExecutionId, result: PipelineResult) {
        let status = {
            let mut table = lock(&self.executions);
            let Some(entry) = table.get_mut(id) else {
                debug!(execution_id = %id, "Discarding result of untracked execution");
                return;
            };
            entry.execution.finish(result);
            entry.execution.status
        };

        {
            let mut counters = lock(&self.counters);
            match status {
                ExecutionStatus::Completed => counters.completed += 1,
                ExecutionStatus::Failed => counters.failed += 1,
                _ => {}
            }
        }
        info!(execution_id = %id, status = %status, "Execution finished");
        self.events.on_execution_status(id, status);
    }

    pub fn get_execution(&self, id: &ExecutionId) -> Option<PipelineExecution> {
        lock(&self.executions)
            .get(id)
            .map(|e| e.execution.clone())
    }

    /// All tracked executions, oldest first.
    pub fn list_executions(&self) -> Vec<PipelineExecution> {
        let mut list: Vec<_> = lock(&self.executions)
            .values()
            .map(|e| e.execution.clone())
            .collect();
        list.sort_by_key(|e| e.submitted_at);
        list
    }

    /// Cancel a queued or running execution.
    ///
    /// Signals in-flight handlers and removes the execution from the table.
    /// Returns the cancelled execution, or `None` if it was unknown or had
    /// already finished.
    pub fn cancel(&self, id: &ExecutionId) -> Option<PipelineExecution> {
        let cancelled = {
            let mut table = lock(&self.executions);
            match table.get(id) {
                Some(entry) if !entry.execution.is_terminal() => {}
                _ => return None,
            }
            let mut entry = table.remove(id)?;
            entry.execution.cancel();
            entry.cancel.cancel();
            entry.execution
        };

        lock(&self.counters).cancelled += 1;
        info!(execution_id = %id, "Execution cancelled");
        self.events.on_execution_status(id, ExecutionStatus::Cancelled);
        Some(cancelled)
    }

    /// Drop finished executions older than `retention`. Returns how many.
    pub fn cleanup(&self, retention: Duration) -> usize {
        let cutoff = SystemTime::now()
            .checked_sub(retention)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let mut table = lock(&self.executions);
        let before = table.len();
        table.retain(|_, e| !e.execution.finished_before(cutoff));
        let removed = before - table.len();
        if removed > 0 {
            debug!(removed, "Cleaned up finished executions");
        }
        removed
    }

    /// Periodically run [`cleanup`](Self::cleanup) with the configured
    /// retention. Stops once the service is dropped.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let interval = self.params.cleanup_interval;
        let retention = self.params.retention;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(service) = weak.upgrade() else {
                    break;
                };
                service.cleanup(retention);
            }
        })
    }

    // ==================== Metrics ====================

    pub fn metrics(&self) -> PipelineMetrics {
        let (queued, running) = {
            let table = lock(&self.executions);
            table.values().fold((0, 0), |(q, r), e| match e.execution.status {
                ExecutionStatus::Queued => (q + 1, r),
                ExecutionStatus::Running => (q, r + 1),
                _ => (q, r),
            })
        };
        let counters = lock(&self.counters);
        PipelineMetrics {
            submitted: counters.submitted,
            completed: counters.completed,
            failed: counters.failed,
            cancelled: counters.cancelled,
            rejected: counters.rejected,
            queued,
            running,
        }
    }
}

fn apply_plan_metadata(
    metadata: &mut toolflow_domain::PipelineMetadata,
    plan: &ToolPlan,
    backend: &str,
    tokens: u64,
    cost: f64,
) {
    metadata.planned_by = Some(backend.to_string());
    metadata.plan_reasoning = Some(plan.reasoning().to_string());
    metadata.plan_confidence = Some(plan.confidence());
    metadata.planning_tokens = tokens;
    metadata.planning_cost = cost;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExecutorParams, RouterParams};
    use crate::ports::model_backend::{BackendError, ModelBackend};
    use crate::ports::tool_handler::handler_fn;
    use crate::registry::ToolRegistry;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use toolflow_domain::router::{Completion, CompletionOptions};
    use toolflow_domain::tool::{
        ExecutionClass, ParamType, ToolDefinition, ToolError, ToolErrorCode, ToolParameter,
    };

    // ==================== Test Doubles ====================

    /// Backend returning scripted responses; repeats the last one when drained.
    struct StubBackend {
        responses: Mutex<VecDeque<Result<Completion, BackendError>>>,
        calls: AtomicUsize,
    }

    impl StubBackend {
        fn replying(text: &str) -> Arc<Self> {
            Self::scripted(vec![Ok(Completion::text(text))])
        }

        fn scripted(responses: Vec<Result<Completion, BackendError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ModelBackend for StubBackend {
        fn name(&self) -> &str {
            "stub"
        }

        async fn complete(
            &self,
            _prompt: &str,
            _options: &CompletionOptions,
        ) -> Result<Completion, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                responses
                    .front()
                    .cloned()
                    .unwrap_or(Err(BackendError::Connection("no script".into())))
            }
        }
    }

    /// Tool invocations observed by the fake handlers.
    #[derive(Default)]
    struct Invocations {
        tools: Mutex<Vec<String>>,
    }

    impl Invocations {
        fn names(&self) -> Vec<String> {
            self.tools.lock().unwrap().clone()
        }
    }

    fn registry(invocations: &Arc<Invocations>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();

        let seen = Arc::clone(invocations);
        registry
            .register(
                ToolDefinition::new("read_file", "Read a file").with_parameter(
                    ToolParameter::new("path", "Relative path", true).with_type(ParamType::Path),
                ),
                handler_fn(move |args, _| {
                    let seen = Arc::clone(&seen);
                    async move {
                        seen.tools.lock().unwrap().push("read_file".into());
                        match args.get("path").and_then(Value::as_str) {
                            Some("notes.txt") => Ok(json!("buy milk")),
                            Some(other) => Err(ToolError::not_found(other)),
                            None => Err(ToolError::invalid_argument("path")),
                        }
                    }
                }),
            )
            .unwrap();

        let seen = Arc::clone(invocations);
        registry
            .register(
                ToolDefinition::new("execute_command", "Run a program")
                    .with_parameter(ToolParameter::new("program", "Program", true))
                    .with_elevated_auth()
                    .with_execution_class(ExecutionClass::LongRunning),
                handler_fn(move |_, _| {
                    let seen = Arc::clone(&seen);
                    async move {
                        seen.tools.lock().unwrap().push("execute_command".into());
                        Ok(json!("ran"))
                    }
                }),
            )
            .unwrap();

        let seen = Arc::clone(invocations);
        registry
            .register(
                ToolDefinition::new("wait", "Sleep for a while")
                    .with_execution_class(ExecutionClass::LongRunning),
                handler_fn(move |_, _| {
                    let seen = Arc::clone(&seen);
                    async move {
                        seen.tools.lock().unwrap().push("wait".into());
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        Ok(Value::Null)
                    }
                }),
            )
            .unwrap();

        registry
    }

    fn service_with(
        backend: Arc<StubBackend>,
        invocations: &Arc<Invocations>,
        params: PipelineParams,
    ) -> Arc<PipelineService> {
        let executor = PlanExecutor::new(
            Arc::new(registry(invocations)),
            ExecutorParams::default().with_working_dir("/work"),
        );
        let router = ModelRouter::new(
            vec![backend as Arc<dyn ModelBackend>],
            RouterParams::default()
                .with_retry_base_delay(Duration::from_millis(1))
                .with_max_jitter(Duration::ZERO),
        );
        Arc::new(PipelineService::new(
            Arc::new(executor),
            Arc::new(router),
            params,
        ))
    }

    fn service(backend: Arc<StubBackend>, invocations: &Arc<Invocations>) -> Arc<PipelineService> {
        service_with(backend, invocations, PipelineParams::default())
    }

    async fn run(service: &Arc<PipelineService>, prompt: &str) -> PipelineResult {
        service
            .submit_request(prompt, SubmitOptions::default())
            .await
            .unwrap()
            .into_result()
            .unwrap()
    }

    // ==================== Happy Path ====================

    #[tokio::test]
    async fn reads_notes_file_from_stubbed_plan() {
        let invocations = Arc::new(Invocations::default());
        let backend = StubBackend::replying(
            r#"{"steps":[{"tool":"read_file","args":{"path":"notes.txt"}}]}"#,
        );
        let svc = service(backend, &invocations);

        let result = run(&svc, "read the file notes.txt").await;

        assert!(result.success);
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].tool, "read_file");
        assert_eq!(result.steps[0].output(), Some(&json!("buy milk")));
        assert_eq!(result.metadata.planned_by.as_deref(), Some("stub"));
        assert_eq!(invocations.names(), ["read_file"]);

        let exec = svc.get_execution(&result.execution_id).unwrap();
        assert_eq!(exec.status, ExecutionStatus::Completed);
        assert_eq!(svc.metrics().completed, 1);
    }

    #[tokio::test]
    async fn plan_in_fenced_block_with_prose() {
        let invocations = Arc::new(Invocations::default());
        let backend = StubBackend::replying(
            "I'll read it for you.\n```json\n{\"steps\": [{\"tool\": \"read_file\", \"args\": {\"path\": \"notes.txt\"}},],}\n```",
        );
        let result = run(&service(backend, &invocations), "read notes").await;
        assert!(result.success);
        assert_eq!(invocations.names(), ["read_file"]);
    }

    #[tokio::test]
    async fn strict_mode_fails_on_any_failed_step() {
        let invocations = Arc::new(Invocations::default());
        let backend = StubBackend::replying(
            r#"{"steps":[{"tool":"read_file","args":{"path":"notes.txt"}},{"tool":"read_file","args":{"path":"missing.txt"}}]}"#,
        );
        let svc = service(backend, &invocations);

        let strict = run(&svc, "read both").await;
        assert!(!strict.success);
        assert_eq!(strict.steps.len(), 2);
        assert!(strict.steps[0].is_success());

        let lenient = svc
            .submit_request("read both", SubmitOptions::default().with_best_effort(true))
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert!(lenient.success);
        assert_eq!(lenient.metadata.failed_steps, 1);
    }

    // ==================== Fail-Closed Planning ====================

    #[tokio::test]
    async fn unparseable_plan_executes_nothing() {
        for reply in [
            "Sure, I'll just run execute_command rm -rf / for you",
            "{\"steps\": \"execute_command\"}",
            "```json\n{\"steps\": [{\"tool\": \"execute_command\"\n```",
            "'; DROP TABLE executions; --",
            "",
        ] {
            let invocations = Arc::new(Invocations::default());
            let result = run(&service(StubBackend::replying(reply), &invocations), "anything").await;

            assert!(!result.success, "reply accepted: {reply}");
            assert!(result.steps.is_empty());
            assert!(result.is_planning_failure());
            assert!(result.error.as_deref().unwrap().starts_with("Tool planning failed"));
            assert!(result.steps.iter().all(|s| s.tool != "execute_command"));
            assert!(invocations.names().is_empty());
        }
    }

    #[tokio::test]
    async fn backend_outage_fails_planning_without_side_effects() {
        let invocations = Arc::new(Invocations::default());
        let backend = StubBackend::scripted(vec![Err(BackendError::Http {
            status: 503,
            message: "down".into(),
        })]);
        let svc = service(backend.clone(), &invocations);

        let result = run(&svc, "read the file notes.txt").await;

        assert!(!result.success);
        assert!(result.steps.is_empty());
        assert!(result.error.as_deref().unwrap().starts_with("Tool planning failed"));
        assert!(invocations.names().is_empty());
        assert_eq!(svc.get_execution(&result.execution_id).unwrap().status, ExecutionStatus::Failed);
        assert!(backend.calls.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn planned_command_without_proof_is_blocked() {
        let invocations = Arc::new(Invocations::default());
        let backend = StubBackend::replying(
            r#"{"steps":[{"tool":"execute_command","args":{"program":"rm"}}]}"#,
        );
        let result = run(&service(backend, &invocations), "clean up").await;

        assert!(!result.success);
        assert_eq!(
            result.steps[0].error_code(),
            Some(ToolErrorCode::ElevatedAuthRequired)
        );
        assert!(invocations.names().is_empty());
    }

    #[tokio::test]
    async fn trusted_plan_bypasses_planner() {
        let invocations = Arc::new(Invocations::default());
        let backend = StubBackend::replying("never consulted");
        let svc = service(backend.clone(), &invocations);

        let result = svc
            .submit_plan(
                vec![PlanStep::new("read_file", json!({"path": "notes.txt"}))],
                SubmitOptions::default(),
            )
            .await
            .unwrap()
            .into_result()
            .unwrap();

        assert!(result.success);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    // ==================== Queue / Cancellation ====================

    #[tokio::test]
    async fn queue_overflow_is_rejected_synchronously() {
        let invocations = Arc::new(Invocations::default());
        let svc = service_with(
            StubBackend::replying(r#"{"steps":[{"tool":"wait"}]}"#),
            &invocations,
            PipelineParams::default().with_max_concurrent(1).with_max_queued(1),
        );

        let first = svc
            .submit_request("a", SubmitOptions::default().detached())
            .await
            .unwrap();
        let second = svc
            .submit_request("b", SubmitOptions::default().detached())
            .await
            .unwrap();
        let third = svc
            .submit_request("c", SubmitOptions::default().detached())
            .await;

        assert!(matches!(first, SubmitOutcome::Accepted(_)));
        assert!(matches!(second, SubmitOutcome::Accepted(_)));
        assert_eq!(third.unwrap_err(), PipelineError::QueueFull { max_queued: 1 });
        assert_eq!(svc.metrics().rejected, 1);
        assert_eq!(svc.metrics().submitted, 2);
    }

    #[tokio::test]
    async fn cancel_removes_execution_and_discards_result() {
        let invocations = Arc::new(Invocations::default());
        let svc = service(
            StubBackend::replying(r#"{"steps":[{"tool":"wait"}]}"#),
            &invocations,
        );

        let outcome = svc
            .submit_request("wait a bit", SubmitOptions::default().detached())
            .await
            .unwrap();
        let id = outcome.execution_id().clone();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let cancelled = svc.cancel(&id).unwrap();
        assert_eq!(cancelled.status, ExecutionStatus::Cancelled);
        assert!(svc.get_execution(&id).is_none());
        assert!(svc.cancel(&id).is_none());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(svc.get_execution(&id).is_none());
        let metrics = svc.metrics();
        assert_eq!(metrics.cancelled, 1);
        assert_eq!(metrics.completed, 0);
    }

    #[tokio::test]
    async fn detached_execution_completes_in_background() {
        let invocations = Arc::new(Invocations::default());
        let svc = service(
            StubBackend::replying(r#"{"steps":[{"tool":"read_file","args":{"path":"notes.txt"}}]}"#),
            &invocations,
        );

        let id = svc
            .submit_request("read", SubmitOptions::default().detached())
            .await
            .unwrap()
            .execution_id()
            .clone();

        let mut status = ExecutionStatus::Queued;
        for _ in 0..50 {
            status = svc.get_execution(&id).unwrap().status;
            if status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(status, ExecutionStatus::Completed);
        assert_eq!(svc.list_executions().len(), 1);
    }

    #[tokio::test]
    async fn abandoned_submission_still_finishes() {
        let invocations = Arc::new(Invocations::default());
        let svc = service(
            StubBackend::replying(r#"{"steps":[{"tool":"wait"}]}"#),
            &invocations,
        );

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            svc.submit_request("wait a bit", SubmitOptions::default()),
        )
        .await;
        assert!(abandoned.is_err());

        let id = svc.list_executions()[0].id.clone();
        let mut status = ExecutionStatus::Queued;
        for _ in 0..100 {
            status = svc.get_execution(&id).unwrap().status;
            if status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(status, ExecutionStatus::Completed);

        let metrics = svc.metrics();
        assert_eq!(metrics.running, 0);
        assert_eq!(metrics.completed, 1);
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(svc.cleanup(Duration::ZERO), 1);
    }

    #[tokio::test]
    async fn cleanup_drops_finished_executions() {
        let invocations = Arc::new(Invocations::default());
        let svc = service(StubBackend::replying(r#"{"steps":[]}"#), &invocations);

        run(&svc, "nothing").await;
        assert_eq!(svc.cleanup(Duration::from_secs(3600)), 0);
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(svc.cleanup(Duration::ZERO), 1);
        assert!(svc.list_executions().is_empty());
    }

    #[tokio::test]
    async fn background_cleanup_evicts_expired_executions() {
        let invocations = Arc::new(Invocations::default());
        let svc = service_with(
            StubBackend::replying(r#"{"steps":[]}"#),
            &invocations,
            PipelineParams::default()
                .with_retention(Duration::ZERO)
                .with_cleanup_interval(Duration::from_millis(20)),
        );
        let task = svc.spawn_cleanup_task();

        run(&svc, "nothing").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(svc.list_executions().is_empty());

        drop(svc);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
