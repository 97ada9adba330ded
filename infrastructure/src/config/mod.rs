//! Configuration file loading for toolflow
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `TOOLFLOW_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./toolflow.toml` or `./.toolflow.toml`
//! 4. Global: `$XDG_CONFIG_HOME/toolflow/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    BackendKind, FileAuditConfig, FileAuthConfig, FileBackendConfig, FileConfig,
    FileExecutorConfig, FileLoggingConfig, FilePipelineConfig, FileRouterConfig,
};
pub use loader::ConfigLoader;
