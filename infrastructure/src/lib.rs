//! Infrastructure layer for toolflow
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: built-in tools, model backends, the JSONL
//! audit log, elevated-auth verification and configuration file loading.

pub mod auth;
pub mod config;
pub mod logging;
pub mod providers;
pub mod tools;

// Re-export commonly used types
pub use auth::SharedSecretVerifier;
pub use config::{
    BackendKind, ConfigLoader, FileAuditConfig, FileAuthConfig, FileBackendConfig, FileConfig,
    FileExecutorConfig, FileLoggingConfig, FilePipelineConfig, FileRouterConfig,
};
pub use logging::JsonlAuditSink;
pub use providers::{
    FixedResponseBackend, OpenAiCompatibleBackend, ProviderBuildError, build_backend,
    build_router,
};
pub use tools::{BuiltinTools, builtin_registry, register_builtin_tools};
