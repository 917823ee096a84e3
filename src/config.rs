//! Configuration management
//!
//! Loaded from an optional YAML file merged with `MTLS_TRUST_`-prefixed
//! environment variables (`__` separates nesting levels, e.g.
//! `MTLS_TRUST_TRUST__LOGGING=false`).
//!
//! # Example YAML
//!
//! ```yaml
//! trust:
//!   stores:
//!     - path: /etc/mtls/ca.pem
//!       format: pem
//!   inflatable:
//!     persisted_path: /var/lib/mtls/extra.pem
//!   logging: true
//!   swappable: true
//! hostname:
//!   verifier: default
//! tls:
//!   client_cert: /etc/mtls/client.pem
//!   client_key: /etc/mtls/client.key
//! ```

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::hostname::HostnameVerifier;
use crate::pem::{load_certs, load_private_key};
use crate::trust::{
    InflatableOptions, InflatableTrustValidator, TrustStore, TrustStoreFormat, TrustValidator,
    ValidationAlgorithm,
};
use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Trust validator stack
    pub trust: TrustConfig,
    /// Hostname verification policy
    pub hostname: HostnameConfig,
    /// Client identity for outgoing handshakes
    pub tls: TlsConfig,
}

impl Config {
    /// Load configuration from `path` (if given) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        figment = figment.merge(Env::prefixed("MTLS_TRUST_").split("__"));

        figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Trust
// ─────────────────────────────────────────────────────────────────────────────

/// Sources and wrappers of the trust validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Trust-store files, each becoming one base validator.
    pub stores: Vec<TrustStoreConfig>,
    /// Also trust the platform's native anchors.
    pub platform_anchors: bool,
    /// Add a runtime-extensible pool.
    pub inflatable: Option<InflatableConfig>,
    /// Accept every certificate. Development only.
    pub unsafe_trust_all: bool,
    /// Log every trust decision.
    pub logging: bool,
    /// Allow the active validator to be replaced at runtime.
    pub swappable: bool,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            stores: Vec::new(),
            platform_anchors: false,
            inflatable: None,
            unsafe_trust_all: false,
            logging: true,
            swappable: true,
        }
    }
}

/// One trust-store file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustStoreConfig {
    /// Bundle location.
    pub path: PathBuf,
    /// Encoding of the file at `path`.
    #[serde(default)]
    pub format: TrustStoreFormat,
    /// Validation algorithm name; the default provider when unset.
    #[serde(default)]
    pub algorithm: Option<String>,
}

/// Runtime-extensible pool settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InflatableConfig {
    /// PEM file the pool is seeded from and appended to.
    pub persisted_path: Option<PathBuf>,
    /// Validation algorithm name; the default provider when unset.
    pub algorithm: Option<String>,
}

impl TrustConfig {
    /// Build the configured validator stack.
    pub fn build_validator(&self) -> Result<TrustValidator> {
        let mut builder = TrustValidator::builder()
            .with_logging(self.logging)
            .with_swappable(self.swappable);

        if self.unsafe_trust_all {
            warn!("unsafe_trust_all is enabled: peer certificates are NOT validated");
            builder = builder.with_trust_validator(TrustValidator::unsafe_trust_all());
        }

        for store in &self.stores {
            let anchors = TrustStore::load(&store.path, store.format)?;
            builder = builder
                .with_trust_store_and_algorithm(anchors, parse_algorithm(store.algorithm.as_deref())?);
        }

        if self.platform_anchors {
            builder = builder.with_platform_anchors();
        }

        if let Some(pool) = &self.inflatable {
            let options = InflatableOptions {
                persisted_path: pool.persisted_path.clone(),
                predicate: None,
                algorithm: parse_algorithm(pool.algorithm.as_deref())?,
            };
            builder = builder.with_trust_validator(InflatableTrustValidator::with_options(options)?.into());
        }

        builder.build()
    }
}

fn parse_algorithm(name: Option<&str>) -> Result<ValidationAlgorithm> {
    name.map_or(Ok(ValidationAlgorithm::Default), str::parse)
}

// ─────────────────────────────────────────────────────────────────────────────
// Hostname
// ─────────────────────────────────────────────────────────────────────────────

/// Named hostname verification policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostnameVerifierKind {
    /// SAN matching
    #[default]
    Default,
    /// Comparison with the session peer host
    Basic,
    /// No verification
    Unsafe,
}

/// Hostname verification policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostnameConfig {
    /// Which verifier to build.
    pub verifier: HostnameVerifierKind,
}

impl HostnameConfig {
    /// Build the configured verifier. Disabling verification is logged at warn level.
    pub fn build_verifier(&self) -> HostnameVerifier {
        match self.verifier {
            HostnameVerifierKind::Default => HostnameVerifier::San,
            HostnameVerifierKind::Basic => HostnameVerifier::Basic,
            HostnameVerifierKind::Unsafe => {
                warn!("Hostname verification is disabled");
                HostnameVerifier::Unsafe
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TLS
// ─────────────────────────────────────────────────────────────────────────────

/// Identity presented when connecting to a server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// PEM certificate chain presented to servers that ask for one.
    pub client_cert: Option<PathBuf>,
    /// PEM private key for `client_cert`.
    pub client_key: Option<PathBuf>,
}

type Identity = (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>);

impl TlsConfig {
    /// The client identity, if configured.
    pub fn client_identity(&self) -> Result<Option<Identity>> {
        match (self.client_cert.as_deref(), self.client_key.as_deref()) {
            (Some(cert), Some(key)) => Ok(Some((load_certs(cert)?, load_private_key(key)?))),
            (None, None) => Ok(None),
            _ => Err(Error::Config(
                "tls.client_cert and tls.client_key must be set together".to_string(),
            )),
        }
    }
}
