//! `[audit]`, `[auth]` and `[logging]` sections

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw audit configuration
///
/// ```toml
/// [audit]
/// enabled = true
/// path = "toolflow-audit.jsonl"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAuditConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for FileAuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from("toolflow-audit.jsonl"),
        }
    }
}

/// Raw elevated-auth configuration
///
/// ```toml
/// [auth]
/// secret_env = "TOOLFLOW_ELEVATED_SECRET"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAuthConfig {
    /// Environment variable holding the shared secret
    pub secret_env: String,
    /// Direct secret (prefer `secret_env`)
    pub secret: Option<String>,
}

impl Default for FileAuthConfig {
    fn default() -> Self {
        Self {
            secret_env: "TOOLFLOW_ELEVATED_SECRET".to_string(),
            secret: None,
        }
    }
}

impl FileAuthConfig {
    pub fn resolve_secret(&self) -> Option<String> {
        self.secret
            .clone()
            .or_else(|| std::env::var(&self.secret_env).ok())
            .filter(|s| !s.is_empty())
    }
}

/// Raw logging configuration
///
/// ```toml
/// [logging]
/// level = "info"
/// file = "/var/log/toolflow/toolflow.log"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Default filter when neither `-v` nor `RUST_LOG` is given
    pub level: Option<String>,
    /// Also write logs to this file
    pub file: Option<PathBuf>,
}
