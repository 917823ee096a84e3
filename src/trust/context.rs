//! The value passed to every trust decision.

use std::fmt;
use std::net::SocketAddr;

use rustls::pki_types::CertificateDer;

use crate::certificate::subject_display;

/// Which side of the handshake presented the chain under validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerRole {
    /// The chain was presented by a connecting client (server-side check).
    Client,
    /// The chain was presented by a server (client-side check).
    Server,
}

impl fmt::Display for PeerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => f.write_str("client"),
            Self::Server => f.write_str("server"),
        }
    }
}

/// Transport details available at handshake time.
///
/// rustls does not hand verifiers a socket, so this carries what the
/// integration layer knows: the server name being connected to and, when the
/// caller supplies it, the peer address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportHandle {
    /// SNI / server name the client is connecting to.
    pub server_name: Option<String>,
    /// Remote socket address, when known.
    pub peer_addr: Option<SocketAddr>,
}

/// Certificate chain, auth type and transport for one validation call.
///
/// Borrowed for the duration of the call and never mutated by any validator.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    role: PeerRole,
    chain: &'a [CertificateDer<'a>],
    auth_type: &'a str,
    transport: Option<&'a TransportHandle>,
}

impl<'a> ValidationContext<'a> {
    /// Context over a leaf-first `chain`.
    pub fn new(role: PeerRole, chain: &'a [CertificateDer<'a>], auth_type: &'a str) -> Self {
        Self {
            role,
            chain,
            auth_type,
            transport: None,
        }
    }

    /// Attach the transport handle of the connection being validated.
    #[must_use]
    pub fn with_transport(mut self, transport: &'a TransportHandle) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Same context presented for the opposite role.
    #[must_use]
    pub fn for_role(mut self, role: PeerRole) -> Self {
        self.role = role;
        self
    }

    /// Which side presented the chain.
    pub fn role(&self) -> PeerRole {
        self.role
    }

    /// Leaf-first certificate chain.
    pub fn chain(&self) -> &'a [CertificateDer<'a>] {
        self.chain
    }

    /// The end-entity certificate, if the chain is non-empty.
    pub fn leaf(&self) -> Option<&'a CertificateDer<'a>> {
        self.chain.first()
    }

    /// Everything after the leaf.
    pub fn intermediates(&self) -> &'a [CertificateDer<'a>] {
        self.chain.get(1..).unwrap_or(&[])
    }

    /// Key exchange / signature family of the leaf, e.g. `"EC"`.
    pub fn auth_type(&self) -> &'a str {
        self.auth_type
    }

    /// Connection details, when the caller has them.
    pub fn transport(&self) -> Option<&'a TransportHandle> {
        self.transport
    }

    /// Printable leaf subject for logs.
    pub fn leaf_subject(&self) -> String {
        self.leaf()
            .map_or_else(|| "<empty chain>".to_owned(), subject_display)
    }
}
