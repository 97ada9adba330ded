//! Build the [`ModelRouter`] from `[router]` configuration.

use super::{FixedResponseBackend, OpenAiCompatibleBackend};
use crate::config::{BackendKind, FileBackendConfig, FileRouterConfig};
use std::sync::Arc;
use thiserror::Error;
use toolflow_application::{BackendError, ModelBackend, ModelRouter};
use tracing::info;

#[derive(Error, Debug)]
pub enum ProviderBuildError {
    #[error("backend '{name}': unknown kind '{kind}'")]
    UnknownKind { name: String, kind: String },

    #[error("backend '{0}': endpoint is required")]
    MissingEndpoint(String),

    #[error("backend '{name}': {source}")]
    Client {
        name: String,
        #[source]
        source: BackendError,
    },
}

/// Instantiate one backend from its config entry.
pub fn build_backend(config: &FileBackendConfig) -> Result<Arc<dyn ModelBackend>, ProviderBuildError> {
    let kind = config
        .parse_kind()
        .map_err(|_| ProviderBuildError::UnknownKind {
            name: config.name.clone(),
            kind: config.kind.clone(),
        })?;

    match kind {
        BackendKind::OpenAi => {
            let endpoint = config
                .endpoint
                .as_deref()
                .ok_or_else(|| ProviderBuildError::MissingEndpoint(config.name.clone()))?;
            let model = config.model.as_deref().unwrap_or("gpt-4o-mini");

            let mut backend = OpenAiCompatibleBackend::new(&config.name, endpoint, model)
                .map_err(|source| ProviderBuildError::Client {
                    name: config.name.clone(),
                    source,
                })?
                .with_rates(config.rates());
            if let Some(key) = config.resolve_api_key() {
                backend = backend.with_api_key(key);
            }
            Ok(Arc::new(backend))
        }
        BackendKind::Fixed => Ok(Arc::new(FixedResponseBackend::new(
            &config.name,
            config.response.clone().unwrap_or_default(),
        ))),
    }
}

/// Build the router with backends in configured order.
pub fn build_router(config: &FileRouterConfig) -> Result<ModelRouter, ProviderBuildError> {
    let backends = config
        .backends
        .iter()
        .map(build_backend)
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        backends = ?backends.iter().map(|b| b.name().to_string()).collect::<Vec<_>>(),
        "Model router configured"
    );
    Ok(ModelRouter::new(backends, config.to_params()))
}
