//! Hostname verification.
//!
//! Chain validation answers "is this a certificate we trust?"; the verifiers
//! here answer "is it the certificate for the host we meant to reach?".
//!
//! | Verifier      | Decision                                                   |
//! |---------------|------------------------------------------------------------|
//! | `San`         | hostname matches a DNS SAN (or IP SAN for IP literals)     |
//! | `Basic`       | hostname equals the session peer host, ignoring case       |
//! | `Unsafe`      | always true                                                |
//! | `Enhanceable` | a custom predicate, falling back to the wrapped verifier   |
//!
//! Wildcards follow RFC 6125 §6.4.3 in its strict form: only a complete
//! left-most `*` label is honoured, it stands for exactly one label, and the
//! remainder of the pattern must have at least two labels.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use rustls::pki_types::CertificateDer;
use tracing::debug;

use crate::certificate::CertInfo;

/// Inputs to a hostname decision.
#[derive(Debug, Clone, Copy)]
pub struct HostnameContext<'a> {
    hostname: &'a str,
    peer_host: Option<&'a str>,
    peer_certificates: &'a [CertificateDer<'a>],
}

impl<'a> HostnameContext<'a> {
    /// `hostname` as requested by the client; `peer_certificates` leaf-first.
    pub fn new(hostname: &'a str, peer_certificates: &'a [CertificateDer<'a>]) -> Self {
        Self {
            hostname,
            peer_host: None,
            peer_certificates,
        }
    }

    /// Host the session is actually connected to.
    #[must_use]
    pub fn with_peer_host(mut self, peer_host: &'a str) -> Self {
        self.peer_host = Some(peer_host);
        self
    }

    /// Hostname being verified.
    pub fn hostname(&self) -> &'a str {
        self.hostname
    }

    /// Host the session was opened to, if known.
    pub fn peer_host(&self) -> Option<&'a str> {
        self.peer_host
    }

    /// Leaf-first chain presented by the peer.
    pub fn peer_certificates(&self) -> &'a [CertificateDer<'a>] {
        self.peer_certificates
    }
}

/// Custom hostname decision; receives the verifier it enhances.
pub type HostnameEnhancer =
    Arc<dyn Fn(&HostnameContext<'_>, &HostnameVerifier) -> bool + Send + Sync>;

/// A hostname verification policy.
#[derive(Clone, Debug, Default)]
pub enum HostnameVerifier {
    /// Leaf DNS/IP SAN matching. The default.
    #[default]
    San,
    /// Case-insensitive comparison with the session peer host.
    Basic,
    /// Accepts every hostname.
    Unsafe,
    /// A base verifier with a custom predicate on top.
    Enhanceable(Arc<EnhanceableHostnameVerifier>),
}

impl HostnameVerifier {
    /// Wrap `base` with a custom decision.
    pub fn enhanceable<F>(base: HostnameVerifier, enhancer: F) -> Self
    where
        F: Fn(&HostnameContext<'_>, &HostnameVerifier) -> bool + Send + Sync + 'static,
    {
        Self::Enhanceable(Arc::new(EnhanceableHostnameVerifier::new(
            base,
            Some(Arc::new(enhancer)),
        )))
    }

    /// Short name used in logs and configuration.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::San => "default",
            Self::Basic => "basic",
            Self::Unsafe => "unsafe",
            Self::Enhanceable(_) => "enhanceable",
        }
    }

    /// Whether `ctx.hostname()` is acceptable for the peer.
    pub fn verify(&self, ctx: &HostnameContext<'_>) -> bool {
        let verified = match self {
            Self::San => verify_san(ctx.hostname, ctx.peer_certificates.first()),
            Self::Basic => ctx
                .peer_host
                .is_some_and(|peer| peer.eq_ignore_ascii_case(ctx.hostname)),
            Self::Unsafe => true,
            Self::Enhanceable(v) => v.verify(ctx),
        };
        if !verified {
            debug!(hostname = ctx.hostname, verifier = self.kind(), "Hostname verification failed");
        }
        verified
    }
}

/// Hostname verifier with an optional custom predicate.
pub struct EnhanceableHostnameVerifier {
    base: HostnameVerifier,
    enhancer: Option<HostnameEnhancer>,
}

impl EnhanceableHostnameVerifier {
    /// Wrap `base`; with no enhancer, `base` decides alone.
    pub fn new(base: HostnameVerifier, enhancer: Option<HostnameEnhancer>) -> Self {
        Self { base, enhancer }
    }

    /// The wrapped verifier.
    pub fn base(&self) -> &HostnameVerifier {
        &self.base
    }

    /// The enhancer's answer when set, otherwise the base verifier's.
    pub fn verify(&self, ctx: &HostnameContext<'_>) -> bool {
        match &self.enhancer {
            Some(enhancer) => enhancer(ctx, &self.base),
            None => self.base.verify(ctx),
        }
    }
}

impl fmt::Debug for EnhanceableHostnameVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnhanceableHostnameVerifier")
            .field("base", &self.base)
            .field("has_enhancer", &self.enhancer.is_some())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SAN matching
// ─────────────────────────────────────────────────────────────────────────────

fn verify_san(hostname: &str, leaf: Option<&CertificateDer<'_>>) -> bool {
    let Some(info) = leaf.and_then(|cert| CertInfo::from_der(cert.as_ref()).ok()) else {
        return false;
    };

    let literal = hostname
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(hostname);
    if let Ok(ip) = literal.parse::<IpAddr>() {
        return info.san_ips.contains(&ip);
    }

    info.san_dns_names
        .iter()
        .any(|pattern| matches_san_pattern(hostname, pattern))
}

/// Whether DNS `hostname` is covered by SAN `pattern`.
///
/// Comparison is ASCII case-insensitive and ignores one trailing dot on
/// either side. A wildcard is honoured only as a whole left-most `*.` label,
/// matches exactly one non-empty label, and needs at least two labels after
/// it (`*.com` never matches).
pub fn matches_san_pattern(hostname: &str, pattern: &str) -> bool {
    let (Some(host), Some(pattern)) = (normalize(hostname), normalize(pattern)) else {
        return false;
    };
    if host.contains('*') {
        return false;
    }
    if !pattern.contains('*') {
        return host == pattern;
    }

    let Some(suffix) = pattern.strip_prefix("*.") else {
        return false;
    };
    if suffix.contains('*') || suffix.split('.').count() < 2 {
        return false;
    }

    host.strip_suffix(suffix)
        .and_then(|rest| rest.strip_suffix('.'))
        .is_some_and(|label| !label.is_empty() && !label.contains('.'))
}

fn normalize(name: &str) -> Option<String> {
    let name = name.strip_suffix('.').unwrap_or(name);
    if name.is_empty() || name.starts_with('.') || name.contains("..") {
        return None;
    }
    Some(name.to_ascii_lowercase())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
