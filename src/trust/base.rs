//! Standard chain validation against a fixed anchor set.

use std::sync::Arc;

use rustls::client::verify_server_cert_signed_by_trust_anchor;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, UnixTime};
use rustls::server::danger::ClientCertVerifier;
use rustls::server::{ParsedCertificate, WebPkiClientVerifier};
use rustls::{CertificateError, RootCertStore};
use tracing::debug;

use super::context::{PeerRole, ValidationContext};
use super::rejection::{Rejection, Verdict};
use super::store::{TrustStore, ValidationAlgorithm};
use crate::Result;

/// Validates chains up to one of a fixed set of trust anchors.
///
/// Built once from a [`TrustStore`]; never mutated afterwards. Signature,
/// validity-window and basic-constraint checks are delegated to webpki through
/// rustls. Hostnames are *not* checked here.
#[derive(Debug)]
pub struct BaseTrustValidator {
    anchors: Vec<CertificateDer<'static>>,
    roots: Arc<RootCertStore>,
    /// `None` when the anchor set is empty; webpki refuses to build one.
    client_verifier: Option<Arc<dyn ClientCertVerifier>>,
    provider: Arc<CryptoProvider>,
}

impl BaseTrustValidator {
    /// Build from `store` with the default validation algorithm.
    pub fn new(store: &TrustStore) -> Result<Self> {
        Self::with_algorithm(store, &ValidationAlgorithm::Default)
    }

    /// Build from `store` with an explicit validation algorithm.
    pub fn with_algorithm(store: &TrustStore, algorithm: &ValidationAlgorithm) -> Result<Self> {
        Self::with_provider(store, algorithm.provider()?)
    }

    pub(crate) fn with_provider(store: &TrustStore, provider: Arc<CryptoProvider>) -> Result<Self> {
        let roots = Arc::new(store.root_store()?);

        let client_verifier = if roots.is_empty() {
            debug!("Empty trust anchor set; every chain will be rejected");
            None
        } else {
            let verifier =
                WebPkiClientVerifier::builder_with_provider(Arc::clone(&roots), Arc::clone(&provider))
                    .build()
                    .map_err(|e| crate::Error::Config(format!("Cannot build chain verifier: {e}")))?;
            Some(verifier)
        };

        Ok(Self {
            anchors: store.certificates().to_vec(),
            roots,
            client_verifier,
            provider,
        })
    }

    /// Validate the chain in `ctx` for the role it carries.
    pub fn validate(&self, ctx: &ValidationContext<'_>) -> Verdict {
        let Some(leaf) = ctx.leaf() else {
            return Err(Rejection::EmptyChain);
        };
        let now = UnixTime::now();

        let result = match ctx.role() {
            PeerRole::Client => match &self.client_verifier {
                Some(verifier) => verifier
                    .verify_client_cert(leaf, ctx.intermediates(), now)
                    .map(|_| ()),
                None => Err(unknown_issuer()),
            },
            PeerRole::Server => {
                if self.roots.is_empty() {
                    Err(unknown_issuer())
                } else {
                    ParsedCertificate::try_from(leaf).and_then(|parsed| {
                        verify_server_cert_signed_by_trust_anchor(
                            &parsed,
                            &self.roots,
                            ctx.intermediates(),
                            now,
                            self.provider.signature_verification_algorithms.all,
                        )
                    })
                }
            }
        };

        result.map_err(Rejection::Untrusted)
    }

    /// The anchor certificates this validator trusts.
    pub fn issuers(&self) -> &[CertificateDer<'static>] {
        &self.anchors
    }

    /// Crypto provider used for signature checks.
    pub fn provider(&self) -> &Arc<CryptoProvider> {
        &self.provider
    }
}

fn unknown_issuer() -> rustls::Error {
    rustls::Error::InvalidCertificate(CertificateError::UnknownIssuer)
}
