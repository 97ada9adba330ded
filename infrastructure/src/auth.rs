//! Shared-secret elevated-auth verifier.
//!
//! The submitter presents the secret as the elevated proof. Comparison is
//! length-independent in time so the proof cannot be probed byte by byte.

use toolflow_application::ElevatedAuthVerifier;
use toolflow_domain::tool::ExecutionContext;
use tracing::warn;

pub struct SharedSecretVerifier {
    secret: String,
}

impl SharedSecretVerifier {
    /// Returns `None` for an empty secret, which would accept empty proofs.
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into();
        (!secret.is_empty()).then_some(Self { secret })
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let len = a.len().max(b.len());
    let mut diff = a.len() ^ b.len();
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= usize::from(x ^ y);
    }
    diff == 0
}

impl ElevatedAuthVerifier for SharedSecretVerifier {
    fn verify(&self, tool: &str, proof: &str, ctx: &ExecutionContext) -> bool {
        let ok = constant_time_eq(self.secret.as_bytes(), proof.as_bytes());
        if !ok {
            warn!(tool, trace_id = %ctx.trace_id, "Elevated-auth proof rejected");
        }
        ok
    }
}
