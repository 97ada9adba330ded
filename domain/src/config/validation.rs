//! Structured configuration issues.
//!
//! Loaders collect every problem they find instead of stopping at the first,
//! so the caller can print warnings and refuse to start only on errors.

use std::fmt;

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the pipeline cannot be built from this configuration.
    Error,
    /// Non-fatal: works, but probably not as intended.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigIssueCode {
    ZeroConcurrency,
    ZeroQueueCapacity,
    ZeroRateLimit,
    ZeroFailureThreshold,
    ZeroTimeout,
    NoBackends,
    UnknownBackendKind,
    DuplicateBackend,
    MissingBackendEndpoint,
    UnknownPriority,
    /// Elevated tools are registered but no verifier secret is configured
    ElevatedAuthUnavailable,
    /// Command execution is enabled without a program allowlist
    UnrestrictedCommands,
}

/// A detected issue in the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{level}: {}", self.message)
    }
}

/// True if any issue is fatal.
pub fn has_errors(issues: &[ConfigIssue]) -> bool {
    issues.iter().any(ConfigIssue::is_error)
}
