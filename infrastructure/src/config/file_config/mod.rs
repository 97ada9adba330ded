//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into application parameter
//! structs at the edge.

mod executor;
mod observability;
mod pipeline;
mod router;

pub use executor::FileExecutorConfig;
pub use observability::{FileAuditConfig, FileAuthConfig, FileLoggingConfig};
pub use pipeline::FilePipelineConfig;
pub use router::{BackendKind, FileBackendConfig, FileRouterConfig};

use serde::{Deserialize, Serialize};
use toolflow_domain::{ConfigIssue, ConfigIssueCode};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub executor: FileExecutorConfig,
    pub router: FileRouterConfig,
    pub pipeline: FilePipelineConfig,
    pub audit: FileAuditConfig,
    pub auth: FileAuthConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.executor.validate());
        issues.extend(self.router.validate());
        issues.extend(self.pipeline.validate());

        if self.executor.enable_commands && self.auth.resolve_secret().is_none() {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ElevatedAuthUnavailable,
                format!(
                    "execute_command requires elevated auth but no secret is set (auth.secret or ${})",
                    self.auth.secret_env
                ),
            ));
        }

        issues
    }
}
