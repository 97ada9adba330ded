//! Model routing use case.
//!
//! [`ModelRouter`] serves `complete(prompt, options)` from an ordered list of
//! backends: the first backend whose breaker admits the call is tried, with
//! retries for retryable failures, and the router falls back to the next
//! backend when one is exhausted or open.
//!
//! Breaker state and metrics are the only mutable state; both sit behind
//! short-lived locks that are never held across an await.

use rand::Rng;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use toolflow_domain::router::{
    CircuitBreaker, CircuitState, CompletionOptions, RoutedCompletion, RouterMetrics,
    Transition, estimate_tokens,
};
use tracing::{debug, info, warn};

use crate::config::RouterParams;
use crate::ports::events::{NoPipelineEvents, PipelineEventNotifier};
use crate::ports::model_backend::{BackendError, ModelBackend};

/// One backend's reason for not serving a call.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendFailure {
    pub backend: String,
    pub reason: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouterError {
    #[error("No model backends configured")]
    NoBackends,

    #[error("All model backends failed: {}", summarize(.0))]
    Exhausted(Vec<BackendFailure>),

    #[error("Completion cancelled")]
    Cancelled,
}

fn summarize(failures: &[BackendFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.backend, f.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

struct BackendSlot {
    backend: Arc<dyn ModelBackend>,
    breaker: Mutex<CircuitBreaker>,
}

pub struct ModelRouter {
    slots: Vec<BackendSlot>,
    params: RouterParams,
    metrics: Mutex<RouterMetrics>,
    events: Arc<dyn PipelineEventNotifier>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ModelRouter {
    pub fn new(backends: Vec<Arc<dyn ModelBackend>>, params: RouterParams) -> Self {
        let slots = backends
            .into_iter()
            .map(|backend| BackendSlot {
                backend,
                breaker: Mutex::new(CircuitBreaker::new(
                    params.failure_threshold,
                    params.reset_timeout,
                )),
            })
            .collect();
        Self {
            slots,
            params,
            metrics: Mutex::new(RouterMetrics::default()),
            events: Arc::new(NoPipelineEvents),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn PipelineEventNotifier>) -> Self {
        self.events = events;
        self
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.backend.name()).collect()
    }

    pub fn breaker_state(&self, backend: &str) -> Option<CircuitState> {
        self.slot(backend).map(|s| lock(&s.breaker).state())
    }

    pub fn failure_count(&self, backend: &str) -> Option<u32> {
        self.slot(backend).map(|s| lock(&s.breaker).failure_count())
    }

    /// Snapshot of the cumulative counters.
    pub fn metrics(&self) -> RouterMetrics {
        lock(&self.metrics).clone()
    }

    pub async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<RoutedCompletion, RouterError> {
        self.complete_with_cancel(prompt, options, &CancellationToken::new())
            .await
    }

    pub async fn complete_with_cancel(
        &self,
        prompt: &str,
        options: &CompletionOptions,
        cancel: &CancellationToken,
    ) -> Result<RoutedCompletion, RouterError> {
        if self.slots.is_empty() {
            return Err(RouterError::NoBackends);
        }

        let mut failures = Vec::new();
        for slot in &self.slots {
            match self.try_backend(slot, prompt, options, cancel).await {
                Ok(completion) => return Ok(completion),
                Err(BackendOutcome::Cancelled) => return Err(RouterError::Cancelled),
                Err(BackendOutcome::Failed(reason)) => {
                    let backend = slot.backend.name().to_string();
                    debug!(backend = %backend, reason = %reason, "Falling back to next backend");
                    failures.push(BackendFailure { backend, reason });
                }
            }
        }

        warn!(failures = failures.len(), "All model backends failed");
        Err(RouterError::Exhausted(failures))
    }

    /// Attempt one backend, retrying retryable failures with backoff.
    async fn try_backend(
        &self,
        slot: &BackendSlot,
        prompt: &str,
        options: &CompletionOptions,
        cancel: &CancellationToken,
    ) -> Result<RoutedCompletion, BackendOutcome> {
        let name = slot.backend.name();
        let mut retry: u32 = 0;

        loop {
            let admitted = {
                let mut breaker = lock(&slot.breaker);
                breaker
                    .try_acquire(Instant::now())
                    .map(|transition| (transition, breaker.state() == CircuitState::HalfOpen))
            };
            let mut trial = match admitted {
                Err(rejection) => {
                    debug!(backend = name, %rejection, "Call rejected by circuit breaker");
                    return Err(BackendOutcome::Failed(rejection.to_string()));
                }
                Ok((transition, holds_trial)) => {
                    self.notify_transition(name, transition);
                    TrialGuard::new(&slot.breaker, holds_trial)
                }
            };

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(BackendOutcome::Cancelled),
                outcome = tokio::time::timeout(
                    self.params.call_timeout,
                    slot.backend.complete(prompt, options),
                ) => outcome.unwrap_or(Err(BackendError::Timeout)),
            };

            match outcome {
                Ok(completion) => {
                    let tokens_in = completion
                        .tokens_in
                        .unwrap_or_else(|| estimate_tokens(prompt));
                    let tokens_out = completion
                        .tokens_out
                        .unwrap_or_else(|| estimate_tokens(&completion.content));
                    let cost = slot.backend.cost_rates().cost(tokens_in, tokens_out);

                    lock(&self.metrics).record_success(tokens_in, tokens_out, cost);
                    trial.disarm();
                    let transition = lock(&slot.breaker).record_success();
                    self.notify_transition(name, transition);

                    info!(
                        backend = name,
                        tokens_in,
                        tokens_out,
                        cost,
                        retries = retry,
                        "Completion served"
                    );
                    return Ok(RoutedCompletion {
                        content: completion.content,
                        tokens_used: tokens_in + tokens_out,
                        cost,
                        backend: name.to_string(),
                        finish_reason: completion.finish_reason,
                    });
                }
                Err(error) => {
                    lock(&self.metrics).record_failure();
                    trial.disarm();
                    let transition = lock(&slot.breaker).record_failure(Instant::now());
                    self.notify_transition(name, transition);

                    if !error.is_retryable() || retry >= self.params.max_retries {
                        warn!(backend = name, %error, retries = retry, "Backend call failed");
                        return Err(BackendOutcome::Failed(error.to_string()));
                    }

                    let delay = self.params.backoff(retry) + jitter(self.params.max_jitter);
                    warn!(
                        backend = name,
                        %error,
                        attempt = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retryable backend failure, backing off"
                    );
                    self.events.on_retry(name, retry + 1, delay, &error);

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(BackendOutcome::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    retry += 1;
                }
            }
        }
    }

    fn notify_transition(&self, backend: &str, transition: Option<Transition>) {
        if let Some(Transition { from, to }) = transition {
            info!(backend, %from, %to, "Circuit breaker transition");
            self.events.on_circuit_transition(backend, from, to);
        }
    }

    fn slot(&self, backend: &str) -> Option<&BackendSlot> {
        self.slots.iter().find(|s| s.backend.name() == backend)
    }
}

/// The half-open trial slot held by one attempt.
///
/// Released on drop unless the attempt's outcome was recorded, so an attempt
/// abandoned by cancellation or by the caller dropping the future leaves the
/// breaker able to grant the next trial.
struct TrialGuard<'a> {
    breaker: &'a Mutex<CircuitBreaker>,
    armed: bool,
}

impl<'a> TrialGuard<'a> {
    fn new(breaker: &'a Mutex<CircuitBreaker>, holds_trial: bool) -> Self {
        Self {
            breaker,
            armed: holds_trial,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TrialGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            lock(self.breaker).release_trial();
        }
    }
}

enum BackendOutcome {
    Failed(String),
    Cancelled,
}

fn jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}
