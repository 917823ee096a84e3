//! Typed validation outcomes.

use thiserror::Error;

/// Outcome of a trust decision: `Ok(())` accepts the peer.
pub type Verdict = std::result::Result<(), Rejection>;

/// Why a certificate chain was not trusted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    /// Chain validation against the trust anchors failed.
    #[error("certificate chain not trusted: {0}")]
    Untrusted(rustls::Error),

    /// The peer presented no certificates.
    #[error("empty certificate chain")]
    EmptyChain,

    /// A user-supplied predicate declined the peer.
    #[error("certificate declined by trust predicate")]
    PredicateDeclined,

    /// Every member of a composite rejected; reasons are in member order.
    #[error("all {} trust validators rejected the chain: [{}]", .0.len(), join_reasons(.0))]
    AllRejected(Vec<Rejection>),
}

impl Rejection {
    /// Flattened list of leaf reasons (composites expanded).
    pub fn reasons(&self) -> Vec<&Rejection> {
        match self {
            Self::AllRejected(inner) => inner.iter().flat_map(Rejection::reasons).collect(),
            other => vec![other],
        }
    }

    /// Map to the error rustls reports for a failed handshake.
    pub fn to_tls_error(&self) -> rustls::Error {
        match self {
            Self::Untrusted(e) => e.clone(),
            Self::EmptyChain => rustls::Error::NoCertificatesPresented,
            Self::PredicateDeclined | Self::AllRejected(_) => rustls::Error::InvalidCertificate(
                rustls::CertificateError::ApplicationVerificationFailure,
            ),
        }
    }
}

fn join_reasons(reasons: &[Rejection]) -> String {
    reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustls::CertificateError;

    #[test]
    fn aggregated_rejection_lists_every_reason() {
        let r = Rejection::AllRejected(vec![
            Rejection::Untrusted(rustls::Error::InvalidCertificate(
                CertificateError::UnknownIssuer,
            )),
            Rejection::PredicateDeclined,
        ]);
        let msg = r.to_string();
        assert!(msg.starts_with("all 2 trust validators rejected"));
        assert!(msg.contains("certificate chain not trusted"));
        assert!(msg.contains("declined by trust predicate"));
    }

    #[test]
    fn reasons_flatten_nested_aggregates() {
        let r = Rejection::AllRejected(vec![
            Rejection::EmptyChain,
            Rejection::AllRejected(vec![Rejection::PredicateDeclined]),
        ]);
        assert_eq!(
            r.reasons(),
            vec![&Rejection::EmptyChain, &Rejection::PredicateDeclined]
        );
    }

    #[test]
    fn untrusted_maps_back_to_its_tls_error() {
        let tls = rustls::Error::InvalidCertificate(CertificateError::Expired);
        assert_eq!(Rejection::Untrusted(tls.clone()).to_tls_error(), tls);
        assert_eq!(
            Rejection::EmptyChain.to_tls_error(),
            rustls::Error::NoCertificatesPresented
        );
    }
}
