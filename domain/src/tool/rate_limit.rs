//! Per-tool sliding-window rate limiting.
//!
//! One [`RateLimiter`] is shared by every execution of a pipeline, so the
//! check-and-record step is done under a single lock.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default sliding window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window call counter keyed by tool name.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: u32,
    window: Duration,
    calls: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    /// `max_calls` per one-minute window.
    pub fn per_minute(max_calls: u32) -> Self {
        Self::new(max_calls, DEFAULT_WINDOW)
    }

    pub fn new(max_calls: u32, window: Duration) -> Self {
        Self {
            max_calls,
            window,
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_calls(&self) -> u32 {
        self.max_calls
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a call for `tool` if it fits in the window.
    ///
    /// Returns `false` (and records nothing) when the limit is reached.
    pub fn try_acquire(&self, tool: &str) -> bool {
        self.try_acquire_at(tool, Instant::now())
    }

    pub fn try_acquire_at(&self, tool: &str, now: Instant) -> bool {
        let mut calls = match self.calls.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let timestamps = calls.entry(tool.to_string()).or_default();

        while let Some(&oldest) = timestamps.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() < self.max_calls as usize {
            timestamps.push_back(now);
            true
        } else {
            false
        }
    }

    /// Calls currently counted in the window for `tool`.
    pub fn current_count(&self, tool: &str) -> usize {
        let now = Instant::now();
        let calls = match self.calls.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        calls
            .get(tool)
            .map(|ts| {
                ts.iter()
                    .filter(|&&t| now.saturating_duration_since(t) < self.window)
                    .count()
            })
            .unwrap_or(0)
    }
}
