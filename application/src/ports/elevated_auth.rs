//! Elevated-auth verification port.
//!
//! Tools flagged `requires_elevated_auth` run only when the context carries a
//! proof that this verifier accepts.

use toolflow_domain::tool::ExecutionContext;

pub trait ElevatedAuthVerifier: Send + Sync {
    /// Return true if `proof` authorizes `tool` in this context.
    fn verify(&self, tool: &str, proof: &str, ctx: &ExecutionContext) -> bool;
}

/// Rejects every proof. Used when no verifier is configured.
pub struct DenyElevated;

impl ElevatedAuthVerifier for DenyElevated {
    fn verify(&self, _tool: &str, _proof: &str, _ctx: &ExecutionContext) -> bool {
        false
    }
}
