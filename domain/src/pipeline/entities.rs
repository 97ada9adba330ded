//! Pipeline execution entities.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use super::value_objects::PipelineResult;
use crate::core::error::DomainError;

/// Opaque execution identifier. Also used as the trace id of the plan run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExecutionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Admission priority. Ordering is `Low < Normal < High`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            other => Err(DomainError::UnknownPriority(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Queued => "queued",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One submitted request, tracked from admission to completion.
///
/// Status only moves forward: `queued → running → completed | failed`, with
/// `cancelled` reachable from either non-terminal state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineExecution {
    pub id: ExecutionId,
    pub session_id: String,
    pub priority: Priority,
    pub status: ExecutionStatus,
    #[serde(serialize_with = "epoch_millis")]
    pub submitted_at: SystemTime,
    #[serde(serialize_with = "opt_epoch_millis")]
    pub started_at: Option<SystemTime>,
    #[serde(serialize_with = "opt_epoch_millis")]
    pub finished_at: Option<SystemTime>,
    pub result: Option<PipelineResult>,
}

impl PipelineExecution {
    pub fn new(id: ExecutionId, session_id: impl Into<String>, priority: Priority) -> Self {
        Self {
            id,
            session_id: session_id.into(),
            priority,
            status: ExecutionStatus::Queued,
            submitted_at: SystemTime::now(),
            started_at: None,
            finished_at: None,
            result: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn mark_running(&mut self) {
        if self.status == ExecutionStatus::Queued {
            self.status = ExecutionStatus::Running;
            self.started_at = Some(SystemTime::now());
        }
    }

    /// Attach the result. Status follows the result's success flag.
    pub fn finish(&mut self, result: PipelineResult) {
        if self.is_terminal() {
            return;
        }
        self.status = if result.success {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::Failed
        };
        self.finished_at = Some(SystemTime::now());
        self.result = Some(result);
    }

    pub fn cancel(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = ExecutionStatus::Cancelled;
        self.finished_at = Some(SystemTime::now());
        true
    }

    /// True for terminal executions that finished before `cutoff`.
    pub fn finished_before(&self, cutoff: SystemTime) -> bool {
        self.is_terminal() && self.finished_at.is_some_and(|t| t < cutoff)
    }
}

fn millis(t: &SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn epoch_millis<S: Serializer>(t: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(millis(t))
}

fn opt_epoch_millis<S: Serializer>(t: &Option<SystemTime>, s: S) -> Result<S::Ok, S::Error> {
    match t {
        Some(t) => s.serialize_some(&millis(t)),
        None => s.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn priority_order_and_parsing() {
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" low ".parse::<Priority>().unwrap(), Priority::Low);
        assert!(matches!(
            "urgent".parse::<Priority>(),
            Err(DomainError::UnknownPriority(p)) if p == "urgent"
        ));
    }

    #[test]
    fn lifecycle_completed() {
        let mut exec = PipelineExecution::new("e1".into(), "s", Priority::Normal);
        assert_eq!(exec.status, ExecutionStatus::Queued);
        exec.mark_running();
        assert_eq!(exec.status, ExecutionStatus::Running);
        assert!(exec.started_at.is_some());

        exec.finish(PipelineResult::from_steps("e1".into(), Vec::new(), false));
        assert_eq!(exec.status, ExecutionStatus::Completed);
        assert!(exec.finished_at.is_some());
    }

    #[test]
    fn failed_result_marks_failed() {
        let mut exec = PipelineExecution::new("e1".into(), "s", Priority::Low);
        exec.mark_running();
        exec.finish(PipelineResult::planning_failed("e1".into(), "backend down"));
        assert_eq!(exec.status, ExecutionStatus::Failed);
    }

    #[test]
    fn cancelled_execution_ignores_late_result() {
        let mut exec = PipelineExecution::new("e1".into(), "s", Priority::High);
        assert!(exec.cancel());
        assert!(!exec.cancel());
        exec.finish(PipelineResult::from_steps("e1".into(), Vec::new(), false));
        assert_eq!(exec.status, ExecutionStatus::Cancelled);
        assert!(exec.result.is_none());
    }

    #[test]
    fn finished_before_only_counts_terminal() {
        let mut exec = PipelineExecution::new("e1".into(), "s", Priority::Normal);
        let future = SystemTime::now() + Duration::from_secs(60);
        assert!(!exec.finished_before(future));
        exec.cancel();
        assert!(exec.finished_before(future));
        assert!(!exec.finished_before(UNIX_EPOCH));
    }
}
