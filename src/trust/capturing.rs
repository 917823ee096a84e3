use std::sync::Arc;

use parking_lot::Mutex;
use rustls::pki_types::CertificateDer;

use super::{TrustValidator, ValidationContext, Verdict};

/// Shared sink for certificates seen by a [`CapturingTrustValidator`].
#[derive(Debug, Clone, Default)]
pub struct CertificateCollector(Arc<Mutex<Vec<CertificateDer<'static>>>>);

impl CertificateCollector {
    /// Empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything captured so far, in arrival order.
    pub fn certificates(&self) -> Vec<CertificateDer<'static>> {
        self.0.lock().clone()
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        self.0.lock().clear();
    }

    /// Number of recorded certificates.
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    /// `true` when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    fn record(&self, chain: &[CertificateDer<'_>]) {
        self.0
            .lock()
            .extend(chain.iter().map(|c| c.clone().into_owned()));
    }
}

/// Records each presented chain, then delegates.
#[derive(Debug)]
pub struct CapturingTrustValidator {
    collector: CertificateCollector,
    inner: TrustValidator,
}

impl CapturingTrustValidator {
    /// Record into `collector`, then let `inner` decide.
    pub fn new(collector: CertificateCollector, inner: TrustValidator) -> Self {
        Self { collector, inner }
    }

    /// The validator that makes the decision.
    pub fn inner(&self) -> &TrustValidator {
        &self.inner
    }

    /// Where presented chains are recorded.
    pub fn collector(&self) -> &CertificateCollector {
        &self.collector
    }

    /// Record the chain in `ctx`, then delegate.
    pub fn validate(&self, ctx: &ValidationContext<'_>) -> Verdict {
        self.collector.record(ctx.chain());
        self.inner.validate(ctx)
    }
}
