//! A trust pool that grows at runtime.
//!
//! Writers serialise on a mutex, rebuild a complete [`BaseTrustValidator`]
//! from the enlarged pool and publish it with a single atomic store. Readers
//! load the published validator without locking and therefore always see
//! either the old or the new pool, never a partial one.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::CertificateDer;
use tracing::{debug, info, warn};

use super::{
    BaseTrustValidator, TrustPredicate, TrustStore, ValidationAlgorithm, ValidationContext,
    Verdict, extend_unique,
};
use crate::pem::{encode_cert, parse_certs, read_file};
use crate::{Error, Result};

/// Construction options for an [`InflatableTrustValidator`].
#[derive(Clone, Default)]
pub struct InflatableOptions {
    /// PEM file the pool is seeded from and appended to.
    pub persisted_path: Option<PathBuf>,
    /// Accepts a peer outright when it returns `true`.
    pub predicate: Option<TrustPredicate>,
    /// Algorithm used for every rebuilt base validator.
    pub algorithm: ValidationAlgorithm,
}

impl fmt::Debug for InflatableOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InflatableOptions")
            .field("persisted_path", &self.persisted_path)
            .field("has_predicate", &self.predicate.is_some())
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// Pool contents plus the additions not yet written to the persisted file.
struct Pool {
    certificates: Vec<CertificateDer<'static>>,
    unpersisted: Vec<CertificateDer<'static>>,
}

/// Validator whose trusted set can be extended without restarting TLS.
pub struct InflatableTrustValidator {
    current: ArcSwap<BaseTrustValidator>,
    pool: Mutex<Pool>,
    predicate: Option<TrustPredicate>,
    persisted: Option<PathBuf>,
    provider: Arc<CryptoProvider>,
}

impl InflatableTrustValidator {
    /// Empty, non-persisted pool without a predicate.
    pub fn new() -> Result<Self> {
        Self::with_options(InflatableOptions::default())
    }

    /// Build with `options`, seeding the pool from the persisted file when it exists.
    pub fn with_options(options: InflatableOptions) -> Result<Self> {
        let provider = options.algorithm.provider()?;

        let seed = match &options.persisted_path {
            Some(path) if path.exists() => {
                let pem = read_file(path)?;
                parse_certs(&pem).map_err(|e| {
                    Error::Config(format!(
                        "Failed to parse persisted trust store '{}': {e}",
                        path.display()
                    ))
                })?
            }
            _ => Vec::new(),
        };
        let store = TrustStore::from_certificates(seed);
        let base = BaseTrustValidator::with_provider(&store, Arc::clone(&provider))?;
        debug!(
            seeded = store.len(),
            persisted = ?options.persisted_path,
            "Inflatable trust pool created"
        );

        Ok(Self {
            current: ArcSwap::from_pointee(base),
            pool: Mutex::new(Pool {
                certificates: store.certificates().to_vec(),
                unpersisted: Vec::new(),
            }),
            predicate: options.predicate,
            persisted: options.persisted_path,
            provider,
        })
    }

    /// Add `certificates` to the pool and publish the rebuilt validator.
    ///
    /// Certificates already in the pool are skipped. Returns how many were
    /// added. When the pool is persisted the new certificates are appended to
    /// the file after the in-memory pool has been published. A failed write
    /// is returned to the caller and the certificates stay queued; every later
    /// call writes the queue first, so a retry with the same certificates
    /// persists them even though none are new.
    pub fn add_certificates(&self, certificates: &[CertificateDer<'static>]) -> Result<usize> {
        let mut pool = self.pool.lock();

        let mut fresh = Vec::new();
        extend_unique(
            &mut fresh,
            certificates
                .iter()
                .filter(|c| !pool.certificates.contains(c))
                .cloned(),
        );

        if !fresh.is_empty() {
            let mut next = pool.certificates.clone();
            next.extend(fresh.iter().cloned());
            let base = BaseTrustValidator::with_provider(
                &TrustStore::from_certificates(next.iter().cloned()),
                Arc::clone(&self.provider),
            )?;

            self.current.store(Arc::new(base));
            pool.certificates = next;
            info!(added = fresh.len(), total = pool.certificates.len(), "Trust pool inflated");
        }

        if let Some(path) = &self.persisted {
            pool.unpersisted.extend(fresh.iter().cloned());
            if !pool.unpersisted.is_empty() {
                append_pem(path, &pool.unpersisted).inspect_err(|e| {
                    warn!(
                        path = %path.display(),
                        pending = pool.unpersisted.len(),
                        error = %e,
                        "Failed to persist trust pool; will retry on next addition"
                    );
                })?;
                debug!(
                    path = %path.display(),
                    written = pool.unpersisted.len(),
                    "Persisted trust pool updated"
                );
                pool.unpersisted.clear();
            }
        }
        Ok(fresh.len())
    }

    /// Accept via the predicate, else validate against the current pool.
    pub fn validate(&self, ctx: &ValidationContext<'_>) -> Verdict {
        if let Some(predicate) = &self.predicate
            && predicate(ctx)
        {
            return Ok(());
        }
        self.current.load().validate(ctx)
    }

    /// Anchors of the currently published validator.
    pub fn issuers(&self) -> Vec<CertificateDer<'static>> {
        self.current.load().issuers().to_vec()
    }

    /// Snapshot of the pool.
    pub fn certificates(&self) -> Vec<CertificateDer<'static>> {
        self.pool.lock().certificates.clone()
    }

    /// Number of pool certificates still waiting to be written to the persisted file.
    pub fn pending_persist(&self) -> usize {
        self.pool.lock().unpersisted.len()
    }

    /// File the pool is mirrored to, if any.
    pub fn persisted_path(&self) -> Option<&Path> {
        self.persisted.as_deref()
    }
}

impl fmt::Debug for InflatableTrustValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InflatableTrustValidator")
            .field("pool_size", &self.pool.lock().certificates.len())
            .field("has_predicate", &self.predicate.is_some())
            .field("persisted", &self.persisted)
            .finish_non_exhaustive()
    }
}

fn append_pem(path: &Path, certificates: &[CertificateDer<'_>]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for cert in certificates {
        file.write_all(encode_cert(cert).as_bytes())?;
    }
    file.flush()?;
    Ok(())
}
