//! Per-backend circuit breaker state machine.
//!
//! ```text
//!            failures >= threshold
//!   CLOSED ─────────────────────────▶ OPEN
//!     ▲                                │ reset timeout elapsed
//!     │ trial succeeds                 ▼
//!     └─────────────────────────── HALF_OPEN
//!                 trial fails: back to OPEN, timeout restarts
//! ```
//!
//! The breaker is a plain value; callers own the locking. Time is passed in
//! explicitly so transitions are deterministic under test.

use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
pub const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Breaker open; carries the time left until a trial is allowed
    Open { retry_in: Duration },
    /// Half-open and the single trial call is already in flight
    TrialInFlight,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Open { retry_in } => {
                write!(f, "circuit open, retry in {}ms", retry_in.as_millis())
            }
            Rejection::TrialInFlight => f.write_str("circuit half-open, trial call in flight"),
        }
    }
}

/// A state change, reported so the caller can log or notify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CircuitState,
    pub to: CircuitState,
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD, DEFAULT_RESET_TIMEOUT)
    }
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            reset_timeout,
            state: CircuitState::Closed,
            failure_count: 0,
            opened_at: None,
            trial_in_flight: false,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    pub fn opened_at(&self) -> Option<Instant> {
        self.opened_at
    }

    /// Ask permission for one attempt.
    ///
    /// An open breaker whose timeout has elapsed moves to half-open and grants
    /// exactly one trial; the transition is returned alongside the grant.
    pub fn try_acquire(&mut self, now: Instant) -> Result<Option<Transition>, Rejection> {
        match self.state {
            CircuitState::Closed => Ok(None),
            CircuitState::Open => {
                let opened_at = self.opened_at.unwrap_or(now);
                let elapsed = now.saturating_duration_since(opened_at);
                if elapsed >= self.reset_timeout {
                    self.trial_in_flight = true;
                    Ok(self.transition(CircuitState::HalfOpen))
                } else {
                    Err(Rejection::Open {
                        retry_in: self.reset_timeout - elapsed,
                    })
                }
            }
            CircuitState::HalfOpen => {
                if self.trial_in_flight {
                    Err(Rejection::TrialInFlight)
                } else {
                    self.trial_in_flight = true;
                    Ok(None)
                }
            }
        }
    }

    /// Record a successful attempt: close the breaker and reset the count.
    pub fn record_success(&mut self) -> Option<Transition> {
        self.failure_count = 0;
        self.opened_at = None;
        self.trial_in_flight = false;
        self.transition(CircuitState::Closed)
    }

    /// Record a failed attempt.
    pub fn record_failure(&mut self, now: Instant) -> Option<Transition> {
        self.failure_count = self.failure_count.saturating_add(1);
        self.trial_in_flight = false;

        match self.state {
            CircuitState::HalfOpen => {
                self.opened_at = Some(now);
                self.transition(CircuitState::Open)
            }
            CircuitState::Closed if self.failure_count >= self.failure_threshold => {
                self.opened_at = Some(now);
                self.transition(CircuitState::Open)
            }
            _ => None,
        }
    }

    /// Release a half-open trial slot without counting the attempt either way.
    ///
    /// Used when the attempt was abandoned (e.g. the caller was cancelled).
    pub fn release_trial(&mut self) {
        self.trial_in_flight = false;
    }

    fn transition(&mut self, to: CircuitState) -> Option<Transition> {
        let from = self.state;
        self.state = to;
        (from != to).then_some(Transition { from, to })
    }
}
