//! Certificate field extraction.
//!
//! Parses an X.509 DER-encoded certificate and extracts the fields the trust
//! layer needs: a printable subject for audit logs, SAN DNS / IP entries for
//! hostname verification, and the public-key algorithm used as the
//! authentication type of a validation context.
//!
//! # No unsafe
//!
//! `x509-parser` performs minimal `unsafe` internally for ASN.1 parsing;
//! this module itself contains no `unsafe` code and simply calls the safe
//! public API.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use rustls::pki_types::CertificateDer;
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::FromDer;

use crate::{Error, Result};

/// Authentication type reported when the key algorithm is not recognised.
pub const UNKNOWN_AUTH_TYPE: &str = "UNKNOWN";

// ─────────────────────────────────────────────────────────────────────────────
// Certificate info
// ─────────────────────────────────────────────────────────────────────────────

/// Fields extracted from a peer or anchor certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertInfo {
    /// Full subject DN in RFC 4514-ish form.
    pub subject: String,

    /// Certificate Common Name (CN).
    pub common_name: Option<String>,

    /// DNS entries of the Subject Alternative Name extension.
    pub san_dns_names: Vec<String>,

    /// IP address entries of the Subject Alternative Name extension.
    pub san_ips: Vec<IpAddr>,

    /// Public key algorithm (`"RSA"`, `"EC"`, `"Ed25519"`, …).
    pub key_algorithm: &'static str,
}

impl CertInfo {
    /// Parse a DER-encoded certificate and extract its fields.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the certificate cannot be parsed.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| Error::Config(format!("Failed to parse certificate: {e}")))?;

        let (san_dns_names, san_ips) = extract_sans(&cert);

        Ok(Self {
            subject: cert.subject().to_string(),
            common_name: extract_cn(&cert),
            san_dns_names,
            san_ips,
            key_algorithm: key_algorithm_of(&cert),
        })
    }
}

/// Printable subject of `cert` for log lines; never fails.
pub fn subject_display(cert: &CertificateDer<'_>) -> String {
    X509Certificate::from_der(cert.as_ref())
        .map(|(_, c)| c.subject().to_string())
        .unwrap_or_else(|_| "<unparseable>".to_owned())
}

/// Authentication type derived from the leaf's public-key algorithm.
///
/// rustls does not expose the negotiated key-exchange/auth type, so the leaf
/// key algorithm stands in for it.
pub fn auth_type_of(cert: &CertificateDer<'_>) -> &'static str {
    X509Certificate::from_der(cert.as_ref())
        .map(|(_, c)| key_algorithm_of(&c))
        .unwrap_or(UNKNOWN_AUTH_TYPE)
}

// ─────────────────────────────────────────────────────────────────────────────
// Extraction helpers
// ─────────────────────────────────────────────────────────────────────────────

fn extract_cn(cert: &X509Certificate<'_>) -> Option<String> {
    cert.subject()
        .iter_common_name()
        .next()
        .and_then(|attr| attr.as_str().ok())
        .map(str::to_owned)
}

fn extract_sans(cert: &X509Certificate<'_>) -> (Vec<String>, Vec<IpAddr>) {
    let mut dns_names = Vec::new();
    let mut ips = Vec::new();

    if let Ok(Some(san_ext)) = cert.subject_alternative_name() {
        for name in &san_ext.value.general_names {
            match name {
                GeneralName::DNSName(dns) => dns_names.push((*dns).to_owned()),
                GeneralName::IPAddress(raw) => {
                    if let Some(ip) = ip_from_octets(raw) {
                        ips.push(ip);
                    }
                }
                _ => {}
            }
        }
    }

    (dns_names, ips)
}

fn ip_from_octets(raw: &[u8]) -> Option<IpAddr> {
    if let Ok(v4) = <[u8; 4]>::try_from(raw) {
        return Some(IpAddr::V4(Ipv4Addr::from(v4)));
    }
    <[u8; 16]>::try_from(raw)
        .ok()
        .map(|v6| IpAddr::V6(Ipv6Addr::from(v6)))
}

fn key_algorithm_of(cert: &X509Certificate<'_>) -> &'static str {
    match cert.public_key().algorithm.algorithm.to_id_string().as_str() {
        "1.2.840.113549.1.1.1" | "1.2.840.113549.1.1.10" => "RSA",
        "1.2.840.10045.2.1" => "EC",
        "1.3.101.112" => "Ed25519",
        "1.3.101.113" => "Ed448",
        _ => UNKNOWN_AUTH_TYPE,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
