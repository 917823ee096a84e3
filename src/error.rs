//! Error types for mtls-trust

use std::io;

use thiserror::Error;

/// Result type alias for mtls-trust
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building, mutating or loading trust material.
///
/// Validation rejections are not errors; see [`crate::trust::Rejection`].
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The builder was asked to build without any trust source
    #[error("Input does not contain any trust validator or trust store")]
    NoSources,

    /// A swap was attempted with a delegate that is not a terminal policy
    #[error("Invalid swap target: {0}")]
    InvalidSwapTarget(String),

    /// A mutation was attempted on a validator of the wrong kind
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// TLS error
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),
}

impl Error {
    /// Returns `true` for errors caused by a caller violating a contract
    /// (as opposed to environmental I/O or TLS failures).
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::NoSources | Self::InvalidSwapTarget(_) | Self::UnsupportedOperation(_)
        )
    }
}
