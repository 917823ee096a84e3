use std::fmt;

use super::{Rejection, TrustEnhancer, TrustValidator, ValidationContext, Verdict};

/// Wraps a validator with a custom accept/reject decision.
///
/// When an enhancer is configured its answer is final: it receives the
/// wrapped validator and decides whether to consult it. Without one the
/// wrapped validator decides alone.
pub struct EnhanceableTrustValidator {
    base: TrustValidator,
    enhancer: Option<TrustEnhancer>,
}

impl EnhanceableTrustValidator {
    /// Wrap `base`; with no enhancer, `base` decides alone.
    pub fn new(base: TrustValidator, enhancer: Option<TrustEnhancer>) -> Self {
        Self { base, enhancer }
    }

    /// The wrapped validator, also handed to the enhancer.
    pub fn base(&self) -> &TrustValidator {
        &self.base
    }

    /// The enhancer's decision when set, otherwise the base validator's.
    pub fn validate(&self, ctx: &ValidationContext<'_>) -> Verdict {
        match &self.enhancer {
            Some(enhancer) if enhancer(ctx, &self.base) => Ok(()),
            Some(_) => Err(Rejection::PredicateDeclined),
            None => self.base.validate(ctx),
        }
    }
}

impl fmt::Debug for EnhanceableTrustValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnhanceableTrustValidator")
            .field("base", &self.base)
            .field("has_enhancer", &self.enhancer.is_some())
            .finish()
    }
}
