//! Applying renewed trust material from an issuing authority.
//!
//! Certificate issuance itself lives elsewhere; a [`CertificateSource`]
//! yields whatever it fetched, and [`apply_renewal`] folds the new roots into a
//! running validator stack without a TLS restart.

use std::fmt;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tracing::info;

use crate::trust::mutation::find_inflatable;
use crate::trust::{TrustStore, TrustValidator};
use crate::{Error, Result};

/// Key, certificate chain and trust roots issued to this workload.
pub struct IssuedMaterial {
    /// Key matching the leaf of `chain`.
    pub private_key: PrivateKeyDer<'static>,
    /// Leaf-first.
    pub chain: Vec<CertificateDer<'static>>,
    /// Anchors peers are expected to chain to.
    pub trust_roots: Vec<CertificateDer<'static>>,
}

impl fmt::Debug for IssuedMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedMaterial")
            .field("private_key", &"<redacted>")
            .field("chain", &self.chain.len())
            .field("trust_roots", &self.trust_roots.len())
            .finish()
    }
}

/// Anything that can hand out freshly issued material.
pub trait CertificateSource: Send + Sync {
    /// Obtain the current material, issuing a fresh certificate if needed.
    fn fetch(&self) -> Result<IssuedMaterial>;
}

/// How a renewal was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalOutcome {
    /// Roots were added to an inflatable pool.
    Inflated {
        /// Roots that were new to the pool.
        added: usize,
    },
    /// A new base validator was swapped in.
    Swapped,
}

/// Apply the trust roots in `material` to `target`.
///
/// An inflatable pool reachable from `target` takes precedence; otherwise a
/// hot-swappable `target` gets a fresh base validator built from the roots.
///
/// # Errors
///
/// `Error::Config` if `material` carries no roots, and
/// `Error::UnsupportedOperation` if `target` can be neither inflated nor swapped.
pub fn apply_renewal(target: &TrustValidator, material: &IssuedMaterial) -> Result<RenewalOutcome> {
    if material.trust_roots.is_empty() {
        return Err(Error::Config(
            "Issued material contains no trust roots".to_string(),
        ));
    }

    if let Some(pool) = find_inflatable(target) {
        let added = pool.add_certificates(&material.trust_roots)?;
        info!(added, "Renewed trust roots added to inflatable pool");
        return Ok(RenewalOutcome::Inflated { added });
    }

    match target {
        TrustValidator::HotSwappable(slot) => {
            let store = TrustStore::from_certificates(material.trust_roots.iter().cloned());
            slot.swap(TrustValidator::from_trust_store(&store)?)?;
            info!(roots = store.len(), "Renewed trust roots swapped in");
            Ok(RenewalOutcome::Swapped)
        }
        other => Err(Error::UnsupportedOperation(format!(
            "a {} validator can neither be inflated nor swapped",
            other.kind()
        ))),
    }
}

/// Fetch from `source` and apply the result to `target`.
pub fn refresh_from(source: &dyn CertificateSource, target: &TrustValidator) -> Result<RenewalOutcome> {
    let material = source.fetch()?;
    apply_renewal(target, &material)
}
