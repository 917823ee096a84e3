use arc_swap::ArcSwap;
use tracing::{info, warn};

use super::{TrustValidator, ValidationContext, ValidatorKind, Verdict};
use crate::{Error, Result};

/// Holds one delegate that can be replaced while handshakes are in flight.
///
/// Every validation loads the delegate exactly once, so a concurrent swap is
/// observed either entirely or not at all by a given call.
#[derive(Debug)]
pub struct HotSwappableTrustValidator {
    slot: ArcSwap<TrustValidator>,
}

impl HotSwappableTrustValidator {
    /// Slot holding `initial`.
    pub fn new(initial: TrustValidator) -> Self {
        Self {
            slot: ArcSwap::from_pointee(initial),
        }
    }

    /// The active delegate.
    pub fn delegate(&self) -> TrustValidator {
        TrustValidator::clone(&self.slot.load())
    }

    /// Replace the delegate.
    ///
    /// If the active delegate is a logging wrapper, `new` is always wrapped
    /// in a fresh one so decisions stay logged, even when `new` already logs.
    /// Other wrappers are not carried over.
    ///
    /// # Errors
    ///
    /// `Error::InvalidSwapTarget` if `new` is itself hot-swappable or
    /// inflatable; the active delegate is left in place.
    pub fn swap(&self, new: TrustValidator) -> Result<()> {
        let kind = new.kind();
        if matches!(kind, ValidatorKind::HotSwappable | ValidatorKind::Inflatable) {
            warn!(rejected = %kind, "Refusing to swap in a non-terminal trust validator");
            return Err(Error::InvalidSwapTarget(format!(
                "a {kind} validator cannot be swapped into a hot-swappable slot"
            )));
        }

        let previous = self.slot.rcu(|current| {
            if matches!(current.as_ref(), TrustValidator::Logging(_)) {
                TrustValidator::logging(new.clone())
            } else {
                new.clone()
            }
        });

        info!(
            previous = %previous.kind(),
            current = %self.slot.load().kind(),
            "Trust validator swapped"
        );
        Ok(())
    }

    /// Validate with the delegate active at the time of the call.
    pub fn validate(&self, ctx: &ValidationContext<'_>) -> Verdict {
        self.slot.load().validate(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{client_ctx, dns_san, self_signed};
    use crate::trust::{Rejection, TrustStore};

    fn rejecting() -> TrustValidator {
        TrustValidator::from_trust_store(&TrustStore::new()).unwrap()
    }

    #[test]
    fn swap_changes_the_decision() {
        let chain = vec![self_signed("peer", &[dns_san("peer.local")]).der];
        let slot = HotSwappableTrustValidator::new(rejecting());
        assert!(matches!(
            slot.validate(&client_ctx(&chain)),
            Err(Rejection::Untrusted(_))
        ));

        slot.swap(TrustValidator::Dummy).unwrap();

        assert_eq!(slot.validate(&client_ctx(&chain)), Ok(()));
        assert_eq!(slot.delegate().kind(), ValidatorKind::Dummy);
    }

    #[test]
    fn logging_wrapper_survives_swap() {
        // GIVEN: a slot whose delegate logs
        let slot = HotSwappableTrustValidator::new(TrustValidator::logging(rejecting()));
        // WHEN: swapping in an unwrapped policy
        slot.swap(TrustValidator::Dummy).unwrap();
        // THEN: it is wrapped in a fresh logging decorator
        let TrustValidator::Logging(logging) = slot.delegate() else {
            panic!("expected logging delegate");
        };
        assert_eq!(logging.inner().kind(), ValidatorKind::Dummy);
    }

    #[test]
    fn logging_delegate_is_wrapped_again() {
        let slot = HotSwappableTrustValidator::new(TrustValidator::logging(rejecting()));
        slot.swap(TrustValidator::logging(TrustValidator::Dummy)).unwrap();
        let TrustValidator::Logging(outer) = slot.delegate() else {
            panic!("expected logging delegate");
        };
        let TrustValidator::Logging(inner) = outer.inner() else {
            panic!("expected the swapped-in logging validator inside the fresh wrapper");
        };
        assert_eq!(inner.inner().kind(), ValidatorKind::Dummy);
    }

    #[test]
    fn enhanceable_wrapper_is_not_preserved() {
        let slot = HotSwappableTrustValidator::new(TrustValidator::enhanceable(
            rejecting(),
            |_, _| false,
        ));
        slot.swap(TrustValidator::Dummy).unwrap();
        assert_eq!(slot.delegate().kind(), ValidatorKind::Dummy);
    }

    #[test]
    fn swapping_in_dynamic_validators_fails_and_keeps_original() {
        let slot = HotSwappableTrustValidator::new(TrustValidator::Dummy);

        let nested = TrustValidator::swappable(TrustValidator::Unsafe);
        let pool = TrustValidator::inflatable().unwrap();
        for target in [nested, pool] {
            let err = slot.swap(target).unwrap_err();
            assert!(matches!(err, Error::InvalidSwapTarget(_)));
        }
        assert_eq!(slot.delegate().kind(), ValidatorKind::Dummy);
    }
}
