//! Runtime operations on a built validator stack.

use rustls::pki_types::CertificateDer;

use super::{InflatableTrustValidator, TrustValidator};
use crate::{Error, Result};

/// Add `certificates` to the inflatable pool reachable from `validator`.
///
/// The pool is found when `validator` is an inflatable validator, the
/// delegate of a hot-swappable slot, the first inflatable member of a
/// composite, or beneath a logging, enhanceable or capturing wrapper.
///
/// # Errors
///
/// `Error::UnsupportedOperation` when no inflatable pool is reachable;
/// otherwise whatever the pool reports.
pub fn add_certificates(
    validator: &TrustValidator,
    certificates: &[CertificateDer<'static>],
) -> Result<usize> {
    find_inflatable(validator)
        .ok_or_else(|| {
            Error::UnsupportedOperation(format!(
                "a {} validator has no inflatable pool to add certificates to",
                validator.kind()
            ))
        })?
        .add_certificates(certificates)
}

/// Replace the delegate of the hot-swappable `base` with `new`.
///
/// # Errors
///
/// `Error::UnsupportedOperation` when `base` is not hot-swappable and
/// `Error::InvalidSwapTarget` when `new` cannot be swapped in.
pub fn swap_trust_validator(base: &TrustValidator, new: TrustValidator) -> Result<()> {
    match base {
        TrustValidator::HotSwappable(slot) => slot.swap(new),
        other => Err(Error::UnsupportedOperation(format!(
            "a {} validator cannot be swapped; wrap it in a hot-swappable validator",
            other.kind()
        ))),
    }
}

pub(crate) fn find_inflatable(
    validator: &TrustValidator,
) -> Option<std::sync::Arc<InflatableTrustValidator>> {
    match validator {
        TrustValidator::Inflatable(pool) => Some(pool.clone()),
        TrustValidator::HotSwappable(slot) => find_inflatable(&slot.delegate()),
        TrustValidator::Composite(composite) => {
            composite.members().iter().find_map(find_inflatable)
        }
        TrustValidator::Logging(v) => find_inflatable(v.inner()),
        TrustValidator::Enhanceable(v) => find_inflatable(v.base()),
        TrustValidator::Capturing(v) => find_inflatable(v.inner()),
        TrustValidator::Base(_) | TrustValidator::Unsafe | TrustValidator::Dummy => None,
    }
}
