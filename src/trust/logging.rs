use tracing::{info, warn};

use super::{TrustValidator, ValidationContext, Verdict};

/// Pass-through that records every trust decision.
///
/// Accepts are logged at `info`, rejects at `warn` with the reason. The
/// verdict of the wrapped validator is returned untouched.
#[derive(Debug)]
pub struct LoggingTrustValidator {
    inner: TrustValidator,
}

impl LoggingTrustValidator {
    /// Log the decisions of `inner`.
    pub fn new(inner: TrustValidator) -> Self {
        Self { inner }
    }

    /// The validator whose decisions are logged.
    pub fn inner(&self) -> &TrustValidator {
        &self.inner
    }

    /// Delegate, then log the outcome.
    pub fn validate(&self, ctx: &ValidationContext<'_>) -> Verdict {
        let verdict = self.inner.validate(ctx);
        match &verdict {
            Ok(()) => info!(
                role = %ctx.role(),
                auth_type = ctx.auth_type(),
                subject = %ctx.leaf_subject(),
                validator = %self.inner.kind(),
                "Peer certificate trusted"
            ),
            Err(reason) => warn!(
                role = %ctx.role(),
                auth_type = ctx.auth_type(),
                subject = %ctx.leaf_subject(),
                validator = %self.inner.kind(),
                reason = %reason,
                "Peer certificate rejected"
            ),
        }
        verdict
    }
}
