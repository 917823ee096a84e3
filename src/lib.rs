//! mtls-trust
//!
//! Composable X.509 trust validation and hostname verification for mutual TLS.
//!
//! # Features
//!
//! - **Stackable validators**: base chain validation, composites, runtime-extensible
//!   pools, hot-swappable slots, custom predicates, decision logging
//! - **Builder**: assembles a stack in a fixed wrapping order
//! - **Hostname verification**: strict SAN matching, peer-host comparison, custom predicates
//! - **rustls integration**: client and server certificate verifiers, config builders
//! - **Renewal**: folds freshly issued trust roots into a running stack

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod certificate;
pub mod cli;
pub mod config;
pub mod error;
pub mod hostname;
pub mod pem;
pub mod rotation;
pub mod tls_mode;
pub mod trust;
pub mod verifier;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Error, Result};
pub use hostname::{HostnameContext, HostnameVerifier};
pub use tls_mode::TlsModeState;
pub use trust::{TrustValidator, TrustValidatorBuilder, ValidationContext};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))?,
        _ => subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))?,
    }

    Ok(())
}
