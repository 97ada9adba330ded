//! Tool handler port
//!
//! The contract every tool implementation satisfies: arguments plus the run's
//! execution context in, a JSON value or a [`ToolError`] out.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use toolflow_domain::tool::{ExecutionContext, ToolError};

/// Port for a single tool implementation.
///
/// Handlers may run concurrently with other handlers (and with themselves in
/// parallel step mode); they must not keep unguarded shared mutable state.
/// `args` has already been validated against the tool's parameter schema,
/// with defaults filled in.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(
        &self,
        args: &Map<String, Value>,
        ctx: &ExecutionContext,
    ) -> Result<Value, ToolError>;
}

/// Handler backed by an async closure.
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Map<String, Value>, ExecutionContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    async fn invoke(
        &self,
        args: &Map<String, Value>,
        ctx: &ExecutionContext,
    ) -> Result<Value, ToolError> {
        (self.f)(args.clone(), ctx.clone()).await
    }
}

/// Wrap an async closure as a shareable handler.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(Map<String, Value>, ExecutionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    Arc::new(FnHandler { f })
}
