//! Trust stores and the validation-algorithm selector.
//!
//! A [`TrustStore`] is a plain, de-duplicated list of anchor certificates.
//! It is loaded from PEM/DER files or from the platform's native anchors and
//! is only turned into a verification engine when a
//! [`BaseTrustValidator`](super::BaseTrustValidator) is built from it.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use rustls::RootCertStore;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::CertificateDer;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::pem::{load_certs, read_file};
use crate::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Trust store
// ─────────────────────────────────────────────────────────────────────────────

/// On-disk encoding of a trust-store file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustStoreFormat {
    /// One or more `CERTIFICATE` PEM blocks.
    #[default]
    Pem,
    /// A single DER-encoded certificate.
    Der,
}

/// An in-memory set of trusted anchor certificates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustStore {
    certificates: Vec<CertificateDer<'static>>,
}

impl TrustStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding `certificates`, duplicates dropped.
    pub fn from_certificates(certificates: impl IntoIterator<Item = CertificateDer<'static>>) -> Self {
        let mut store = Self::new();
        for cert in certificates {
            store.add(cert);
        }
        store
    }

    /// Load a store from `path` in the given `format`.
    ///
    /// # Errors
    ///
    /// `Error::Io` when the file cannot be read, `Error::Config` when it holds
    /// no certificate.
    pub fn load(path: &Path, format: TrustStoreFormat) -> Result<Self> {
        let store = match format {
            TrustStoreFormat::Pem => Self::from_certificates(load_certs(path)?),
            TrustStoreFormat::Der => {
                let der = read_file(path)?;
                if der.is_empty() {
                    return Err(Error::Config(format!(
                        "No certificate found in '{}'",
                        path.display()
                    )));
                }
                Self::from_certificates([CertificateDer::from(der)])
            }
        };
        debug!(path = %path.display(), anchors = store.len(), "Trust store loaded");
        Ok(store)
    }

    /// Load the platform's native trust anchors.
    ///
    /// Individual unreadable platform certificates are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when no platform anchor could be loaded.
    pub fn platform() -> Result<Self> {
        let loaded = rustls_native_certs::load_native_certs();
        for err in &loaded.errors {
            warn!(error = %err, "Failed to load platform trust anchor");
        }
        if loaded.certs.is_empty() {
            return Err(Error::Config(
                "No platform trust anchors could be loaded".to_string(),
            ));
        }
        let store = Self::from_certificates(loaded.certs);
        debug!(anchors = store.len(), "Platform trust anchors loaded");
        Ok(store)
    }

    /// Add `cert`; returns `false` if it was already present.
    pub fn add(&mut self, cert: CertificateDer<'static>) -> bool {
        if self.certificates.contains(&cert) {
            return false;
        }
        self.certificates.push(cert);
        true
    }

    /// Anchors in insertion order.
    pub fn certificates(&self) -> &[CertificateDer<'static>] {
        &self.certificates
    }

    /// Number of anchors.
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// `true` when there are no anchors.
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Materialize the anchors into a rustls root store.
    pub(crate) fn root_store(&self) -> Result<RootCertStore> {
        let mut roots = RootCertStore::empty();
        for cert in &self.certificates {
            roots
                .add(cert.clone())
                .map_err(|e| Error::Config(format!("Failed to add trust anchor: {e}")))?;
        }
        Ok(roots)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation algorithm
// ─────────────────────────────────────────────────────────────────────────────

/// Selects the signature-verification engine behind chain validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ValidationAlgorithm {
    /// The process-default rustls provider, or aws-lc-rs when none is installed.
    #[default]
    Default,
    /// An explicitly named provider.
    Named(String),
}

impl ValidationAlgorithm {
    /// Resolve to a crypto provider.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an unknown provider name.
    pub fn provider(&self) -> Result<Arc<CryptoProvider>> {
        match self {
            Self::Default => Ok(default_provider()),
            Self::Named(name) => match name.to_ascii_lowercase().as_str() {
                "aws-lc-rs" | "aws_lc_rs" => {
                    Ok(Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
                }
                "default" => Self::Default.provider(),
                _ => Err(Error::Config(format!(
                    "Unknown validation algorithm '{name}' (supported: aws-lc-rs)"
                ))),
            },
        }
    }
}

/// The process-default crypto provider, or aws-lc-rs when none is installed.
pub(crate) fn default_provider() -> Arc<CryptoProvider> {
    CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

impl FromStr for ValidationAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let algorithm = if s.eq_ignore_ascii_case("default") {
            Self::Default
        } else {
            Self::Named(s.to_string())
        };
        // Fail fast on unknown names
        algorithm.provider()?;
        Ok(algorithm)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
