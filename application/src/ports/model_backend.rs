//! Model backend port
//!
//! Defines the interface for a single language-model provider. The router
//! owns several of these and decides which one serves a call.

use async_trait::async_trait;
use thiserror::Error;
use toolflow_domain::router::{Completion, CompletionOptions, CostRates};

/// Errors a backend may surface.
///
/// HTTP-class failures keep their status code so the router can tell
/// retryable failures from fatal ones.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl BackendError {
    /// 5xx, 408, 429, connection failures and timeouts are retried; other
    /// 4xx, auth failures and malformed responses are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Http { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            BackendError::Connection(_) | BackendError::Timeout => true,
            BackendError::InvalidResponse(_) | BackendError::Unauthorized(_) => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Port for a model-completion provider.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Stable name used in logs, metrics and breaker lookups
    fn name(&self) -> &str;

    /// Pricing for this backend; free unless overridden
    fn cost_rates(&self) -> CostRates {
        CostRates::free()
    }

    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Completion, BackendError>;
}
