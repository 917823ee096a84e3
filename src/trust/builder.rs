//! Assembles validator stacks in the canonical wrapping order.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{
    CompositeTrustValidator, EnhanceableTrustValidator, TrustEnhancer, TrustStore, TrustValidator,
    ValidationAlgorithm, ValidationContext,
};
use crate::{Error, Result};

enum Source {
    Validator(TrustValidator),
    Store {
        store: TrustStore,
        algorithm: ValidationAlgorithm,
    },
    Platform,
}

/// Builder for a [`TrustValidator`] stack.
///
/// The result is, from the inside out: the combined sources, an enhanceable
/// wrapper (when an enhancer is set), a logging wrapper, and finally a
/// hot-swappable slot.
#[derive(Default)]
pub struct TrustValidatorBuilder {
    sources: Vec<Source>,
    logging: bool,
    swappable: bool,
    enhancer: Option<TrustEnhancer>,
}

impl TrustValidatorBuilder {
    /// Empty builder: no sources, no logging, not swappable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a ready-made validator as a source.
    #[must_use]
    pub fn with_trust_validator(mut self, validator: TrustValidator) -> Self {
        self.sources.push(Source::Validator(validator));
        self
    }

    /// Add several validators as sources.
    #[must_use]
    pub fn with_trust_validators(mut self, validators: impl IntoIterator<Item = TrustValidator>) -> Self {
        self.sources
            .extend(validators.into_iter().map(Source::Validator));
        self
    }

    /// Add a trust store, validated with the default algorithm.
    #[must_use]
    pub fn with_trust_store(self, store: TrustStore) -> Self {
        self.with_trust_store_and_algorithm(store, ValidationAlgorithm::Default)
    }

    /// Add several trust stores with the default algorithm.
    #[must_use]
    pub fn with_trust_stores(mut self, stores: impl IntoIterator<Item = TrustStore>) -> Self {
        self.sources.extend(stores.into_iter().map(|store| Source::Store {
            store,
            algorithm: ValidationAlgorithm::Default,
        }));
        self
    }

    /// Add a trust store with an explicit validation algorithm.
    #[must_use]
    pub fn with_trust_store_and_algorithm(
        mut self,
        store: TrustStore,
        algorithm: ValidationAlgorithm,
    ) -> Self {
        self.sources.push(Source::Store { store, algorithm });
        self
    }

    /// Trust the platform's native anchors as well.
    #[must_use]
    pub fn with_platform_anchors(mut self) -> Self {
        self.sources.push(Source::Platform);
        self
    }

    /// Log every decision of the built stack.
    #[must_use]
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }

    /// Put the built stack into a hot-swappable slot.
    #[must_use]
    pub fn with_swappable(mut self, enabled: bool) -> Self {
        self.swappable = enabled;
        self
    }

    /// Make `enhancer` the final decision over the combined sources.
    ///
    /// Only one enhancer is kept; a later call replaces an earlier one.
    #[must_use]
    pub fn with_trust_enhancer<F>(mut self, enhancer: F) -> Self
    where
        F: Fn(&ValidationContext<'_>, &TrustValidator) -> bool + Send + Sync + 'static,
    {
        self.enhancer = Some(Arc::new(enhancer));
        self
    }

    /// Build the stack.
    ///
    /// # Errors
    ///
    /// `Error::NoSources` when no validator or store was given; errors from
    /// loading platform anchors or building base validators are propagated.
    pub fn build(self) -> Result<TrustValidator> {
        if self.sources.is_empty() {
            return Err(Error::NoSources);
        }

        let mut validators = Vec::with_capacity(self.sources.len());
        for source in self.sources {
            validators.push(match source {
                Source::Validator(v) => v,
                Source::Store { store, algorithm } => {
                    TrustValidator::from_trust_store_with_algorithm(&store, &algorithm)?
                }
                Source::Platform => TrustValidator::from_trust_store(&TrustStore::platform()?)?,
            });
        }

        let mut validator = match promote_accept_all(&validators) {
            Some(accept_all) => accept_all,
            None => {
                let combined = combine_all(validators);
                match self.enhancer {
                    Some(enhancer) => {
                        EnhanceableTrustValidator::new(combined, Some(enhancer)).into()
                    }
                    None => combined,
                }
            }
        };

        if self.logging {
            validator = TrustValidator::logging(validator);
        }
        if self.swappable {
            validator = TrustValidator::swappable(validator);
        }

        debug!(
            kind = %validator.kind(),
            logging = self.logging,
            swappable = self.swappable,
            "Trust validator built"
        );
        Ok(validator)
    }
}

impl fmt::Debug for TrustValidatorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustValidatorBuilder")
            .field("sources", &self.sources.len())
            .field("logging", &self.logging)
            .field("swappable", &self.swappable)
            .field("has_enhancer", &self.enhancer.is_some())
            .finish()
    }
}

/// Combine `validators` into one: an accept-all member wins outright, a
/// single member is returned as is, several are flattened into a composite.
///
/// # Errors
///
/// `Error::NoSources` when `validators` is empty.
pub fn combine(validators: impl IntoIterator<Item = TrustValidator>) -> Result<TrustValidator> {
    let validators: Vec<_> = validators.into_iter().collect();
    if validators.is_empty() {
        return Err(Error::NoSources);
    }
    Ok(promote_accept_all(&validators).unwrap_or_else(|| combine_all(validators)))
}

/// The first Unsafe validator, else the first Dummy.
fn promote_accept_all(validators: &[TrustValidator]) -> Option<TrustValidator> {
    let promoted = validators
        .iter()
        .find(|v| matches!(v, TrustValidator::Unsafe))
        .or_else(|| validators.iter().find(|v| matches!(v, TrustValidator::Dummy)))?
        .clone();

    if validators.len() > 1 {
        debug!(
            promoted = %promoted.kind(),
            discarded = validators.len() - 1,
            "Accept-all trust validator present; other sources are ignored"
        );
    }
    Some(promoted)
}

fn combine_all(mut validators: Vec<TrustValidator>) -> TrustValidator {
    if validators.len() == 1
        && let Some(single) = validators.pop()
    {
        return single;
    }
    CompositeTrustValidator::new(validators).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ca, client_ctx, dns_san, self_signed};
    use crate::trust::{Rejection, ValidatorKind};

    fn store_of(anchor: &rustls::pki_types::CertificateDer<'static>) -> TrustStore {
        TrustStore::from_certificates([anchor.clone()])
    }

    #[test]
    fn no_sources_is_an_error() {
        assert!(matches!(
            TrustValidatorBuilder::new().with_logging(true).build(),
            Err(Error::NoSources)
        ));
        assert!(matches!(combine(Vec::<TrustValidator>::new()), Err(Error::NoSources)));
    }

    #[test]
    fn single_store_builds_a_plain_base() {
        let root = ca("root");
        let v = TrustValidatorBuilder::new()
            .with_trust_store(store_of(&root.cert.der))
            .build()
            .unwrap();
        assert_eq!(v.kind(), ValidatorKind::Base);
    }

    #[test]
    fn several_sources_become_a_composite() {
        let (a, b) = (ca("a"), ca("b"));
        let v = TrustValidatorBuilder::new()
            .with_trust_stores([store_of(&a.cert.der), store_of(&b.cert.der)])
            .with_trust_validator(TrustValidator::inflatable().unwrap())
            .build()
            .unwrap();
        let TrustValidator::Composite(composite) = &v else {
            panic!("expected composite, got {}", v.kind());
        };
        assert_eq!(composite.members().len(), 3);
    }

    #[test]
    fn canonical_wrapping_order() {
        // GIVEN: every optional layer requested
        let root = ca("root");
        let v = TrustValidatorBuilder::new()
            .with_trust_store(store_of(&root.cert.der))
            .with_trust_enhancer(|ctx, base| base.validate(ctx).is_ok())
            .with_logging(true)
            .with_swappable(true)
            .build()
            .unwrap();

        // THEN: HotSwappable(Logging(Enhanceable(Base)))
        let TrustValidator::HotSwappable(slot) = &v else {
            panic!("outermost layer must be hot-swappable");
        };
        let TrustValidator::Logging(logging) = slot.delegate() else {
            panic!("second layer must be logging");
        };
        let TrustValidator::Enhanceable(enhanceable) = logging.inner() else {
            panic!("third layer must be enhanceable");
        };
        assert_eq!(enhanceable.base().kind(), ValidatorKind::Base);
    }

    #[test]
    fn unsafe_wins_over_dummy_and_stores() {
        let root = ca("root");
        let v = TrustValidatorBuilder::new()
            .with_trust_store(store_of(&root.cert.der))
            .with_trust_validator(TrustValidator::Dummy)
            .with_trust_validator(TrustValidator::Unsafe)
            .build()
            .unwrap();
        assert_eq!(v.kind(), ValidatorKind::Unsafe);

        let stranger = vec![self_signed("stranger", &[dns_san("stranger.local")]).der];
        assert_eq!(v.validate(&client_ctx(&stranger)), Ok(()));
    }

    #[test]
    fn enhancer_is_skipped_for_accept_all_sources() {
        let v = TrustValidatorBuilder::new()
            .with_trust_validator(TrustValidator::Dummy)
            .with_trust_enhancer(|_, _| false)
            .build()
            .unwrap();
        assert_eq!(v.kind(), ValidatorKind::Dummy);
    }

    #[test]
    fn enhancer_declining_is_reported() {
        let root = ca("root");
        let chain = vec![root.leaf("svc", &[dns_san("svc.local")]).der];
        let v = TrustValidatorBuilder::new()
            .with_trust_store(store_of(&root.cert.der))
            .with_trust_enhancer(|_, _| false)
            .build()
            .unwrap();
        assert_eq!(
            v.validate(&client_ctx(&chain)),
            Err(Rejection::PredicateDeclined)
        );
    }

    #[test]
    fn unknown_algorithm_fails_the_build() {
        let root = ca("root");
        let err = TrustValidatorBuilder::new()
            .with_trust_store_and_algorithm(
                store_of(&root.cert.der),
                ValidationAlgorithm::Named("PKIX".into()),
            )
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
