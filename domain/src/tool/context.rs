//! Per-run execution context handed to every tool handler.

use super::rate_limit::RateLimiter;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Context for one plan run.
///
/// Built once per `run_plan` call and passed by reference into every step's
/// handler, so handlers can observe it but never hold on to it past the run.
/// The rate limiter is the only piece shared between concurrent runs.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub trace_id: String,
    pub session_id: String,
    pub working_directory: PathBuf,
    /// Permitted tool names; `None` means every registered tool is permitted
    pub allowlist: Option<HashSet<String>>,
    /// Scopes granted to this run
    pub scopes: Vec<String>,
    /// Proof-of-intent for elevated tools, supplied by the trusted caller
    pub elevated_proof: Option<String>,
    pub rate_limits: Arc<RateLimiter>,
}

impl ExecutionContext {
    pub fn new(
        trace_id: impl Into<String>,
        working_directory: impl Into<PathBuf>,
        rate_limits: Arc<RateLimiter>,
    ) -> Self {
        Self {
            trace_id: trace_id.into(),
            session_id: String::new(),
            working_directory: working_directory.into(),
            allowlist: None,
            scopes: Vec::new(),
            elevated_proof: None,
            rate_limits,
        }
    }

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

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    /// Allowlist membership; always true when no allowlist is defined.
    pub fn is_allowed(&self, tool: &str) -> bool {
        self.allowlist
            .as_ref()
            .is_none_or(|allowed| allowed.contains(tool))
    }

    /// Scope check: a tool without scopes, or a context without scopes, passes.
    pub fn scope_permits(&self, tool_scopes: &[String]) -> bool {
        if tool_scopes.is_empty() || self.scopes.is_empty() {
            return true;
        }
        tool_scopes.iter().any(|s| self.scopes.contains(s))
    }
}
