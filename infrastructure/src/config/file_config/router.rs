//! Router configuration from TOML (`[router]` and `[[router.backends]]`)

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;
use toolflow_application::RouterParams;
use toolflow_domain::router::CostRates;
use toolflow_domain::{ConfigIssue, ConfigIssueCode};

/// Raw router configuration from TOML
///
/// # Example
///
/// ```toml
/// [router]
/// failure_threshold = 3
/// reset_timeout_ms = 60000
/// max_retries = 3
///
/// [[router.backends]]
/// name = "primary"
/// kind = "openai"
/// endpoint = "https://api.openai.com/v1"
/// model = "gpt-4o-mini"
/// api_key_env = "OPENAI_API_KEY"
/// input_cost_per_1k = 0.00015
/// output_cost_per_1k = 0.0006
///
/// [[router.backends]]
/// name = "offline"
/// kind = "fixed"
/// response = '{"steps": []}'
/// ```
///
/// Backends are tried in the order listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRouterConfig {
    pub failure_threshold: u32,
    pub reset_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub max_jitter_ms: u64,
    pub call_timeout_ms: u64,
    pub backends: Vec<FileBackendConfig>,
}

impl Default for FileRouterConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            reset_timeout_ms: 60_000,
            max_retries: 3,
            retry_base_delay_ms: 500,
            max_jitter_ms: 100,
            call_timeout_ms: 60_000,
            backends: Vec::new(),
        }
    }
}

/// Supported backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// OpenAI-compatible chat-completions endpoint
    OpenAi,
    /// Returns `response` verbatim
    Fixed,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "openai-compatible" | "openai_compatible" => Ok(BackendKind::OpenAi),
            "fixed" => Ok(BackendKind::Fixed),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBackendConfig {
    pub name: String,
    /// "openai" or "fixed"
    pub kind: String,
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub endpoint: Option<String>,
    pub model: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    /// Direct API key (prefer `api_key_env`)
    pub api_key: Option<String>,
    /// Response text for `fixed` backends
    pub response: Option<String>,
    pub input_cost_per_1k: f64,
    pub output_cost_per_1k: f64,
}

impl FileBackendConfig {
    pub fn parse_kind(&self) -> Result<BackendKind, ConfigIssue> {
        self.kind.parse().map_err(|value| {
            ConfigIssue::error(
                ConfigIssueCode::UnknownBackendKind,
                format!(
                    "router.backends.{}: unknown kind '{}' (expected \"openai\" or \"fixed\")",
                    self.name, value
                ),
            )
        })
    }

    pub fn rates(&self) -> CostRates {
        CostRates::new(self.input_cost_per_1k, self.output_cost_per_1k)
    }

    /// Explicit key first, then the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| {
            self.api_key_env
                .as_deref()
                .and_then(|var| std::env::var(var).ok())
        })
    }
}

impl FileRouterConfig {
    pub fn to_params(&self) -> RouterParams {
        RouterParams::default()
            .with_failure_threshold(self.failure_threshold)
            .with_reset_timeout(Duration::from_millis(self.reset_timeout_ms))
            .with_max_retries(self.max_retries)
            .with_retry_base_delay(Duration::from_millis(self.retry_base_delay_ms))
            .with_max_jitter(Duration::from_millis(self.max_jitter_ms))
            .with_call_timeout(Duration::from_millis(self.call_timeout_ms))
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.failure_threshold == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroFailureThreshold,
                "router.failure_threshold must be at least 1",
            ));
        }
        if self.call_timeout_ms == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroTimeout,
                "router.call_timeout_ms must be greater than 0",
            ));
        }
        if self.backends.is_empty() {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::NoBackends,
                "no [[router.backends]] configured; natural-language requests cannot be planned",
            ));
        }

        let mut seen = HashSet::new();
        for backend in &self.backends {
            if !seen.insert(backend.name.as_str()) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::DuplicateBackend,
                    format!("router.backends: duplicate name '{}'", backend.name),
                ));
            }
            match backend.parse_kind() {
                Ok(BackendKind::OpenAi) if backend.endpoint.is_none() => {
                    issues.push(ConfigIssue::error(
                        ConfigIssueCode::MissingBackendEndpoint,
                        format!("router.backends.{}: endpoint is required", backend.name),
                    ));
                }
                Ok(_) => {}
                Err(issue) => issues.push(issue),
            }
        }

        issues
    }
}
