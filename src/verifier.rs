//! rustls integration.
//!
//! [`TrustClientVerifier`] lets a rustls server consult a [`TrustValidator`]
//! for client certificates; [`TrustServerVerifier`] lets a rustls client
//! consult a validator plus a [`HostnameVerifier`] for the server's chain.
//! Handshake signatures are always checked with the configured crypto
//! provider, whatever the trust policy.

use std::iter;
use std::net::SocketAddr;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use rustls::{
    CertificateError, ClientConfig, DigitallySignedStruct, DistinguishedName, RootCertStore,
    ServerConfig, SignatureScheme,
};
use tracing::debug;

use crate::Result;
use crate::certificate::auth_type_of;
use crate::hostname::{HostnameContext, HostnameVerifier};
use crate::tls_mode::TlsModeState;
use crate::trust::{PeerRole, TransportHandle, TrustValidator, ValidationContext, default_provider};

// ─────────────────────────────────────────────────────────────────────────────
// Client certificates (server side)
// ─────────────────────────────────────────────────────────────────────────────

/// Verifies client certificates with a [`TrustValidator`].
#[derive(Debug)]
pub struct TrustClientVerifier {
    validator: TrustValidator,
    provider: Arc<CryptoProvider>,
    root_hints: Vec<DistinguishedName>,
    mandatory: bool,
    tls_mode: Option<Arc<TlsModeState>>,
}

impl TrustClientVerifier {
    /// Client certificates are required by default.
    pub fn new(validator: TrustValidator) -> Self {
        Self::with_provider(validator, default_provider())
    }

    /// Like [`Self::new`] with an explicit crypto provider.
    pub fn with_provider(validator: TrustValidator, provider: Arc<CryptoProvider>) -> Self {
        // A dynamic trusted set would make the hints stale.
        let root_hints = if validator.is_dynamic() {
            Vec::new()
        } else {
            let mut roots = RootCertStore::empty();
            roots.add_parsable_certificates(validator.issuers());
            roots.subjects()
        };
        Self {
            validator,
            provider,
            root_hints,
            mandatory: true,
            tls_mode: None,
        }
    }

    /// Whether a client must present a certificate when no TLS mode is set.
    #[must_use]
    pub fn with_mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = mandatory;
        self
    }

    /// Let the shared TLS mode decide whether client certificates are required.
    #[must_use]
    pub fn with_tls_mode(mut self, tls_mode: Arc<TlsModeState>) -> Self {
        self.tls_mode = Some(tls_mode);
        self
    }

    /// The validator consulted for client chains.
    pub fn validator(&self) -> &TrustValidator {
        &self.validator
    }

    /// Crypto provider for handshake signatures.
    pub fn provider(&self) -> &Arc<CryptoProvider> {
        &self.provider
    }
}

impl ClientCertVerifier for TrustClientVerifier {
    fn client_auth_mandatory(&self) -> bool {
        self.tls_mode
            .as_ref()
            .and_then(|state| state.tls_mode())
            .unwrap_or(self.mandatory)
    }

    fn root_hint_subjects(&self) -> &[DistinguishedName] {
        &self.root_hints
    }

    fn verify_client_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _now: UnixTime,
    ) -> std::result::Result<ClientCertVerified, rustls::Error> {
        let chain = full_chain(end_entity, intermediates);
        let ctx = ValidationContext::new(PeerRole::Client, &chain, auth_type_of(end_entity));

        self.validator
            .validate(&ctx)
            .map(|()| ClientCertVerified::assertion())
            .map_err(|rejection| rejection.to_tls_error())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server certificates (client side)
// ─────────────────────────────────────────────────────────────────────────────

/// Verifies server certificates with a [`TrustValidator`] and a hostname policy.
#[derive(Debug)]
pub struct TrustServerVerifier {
    validator: TrustValidator,
    hostname: HostnameVerifier,
    provider: Arc<CryptoProvider>,
    peer_addr: Option<SocketAddr>,
    peer_host: Option<String>,
}

impl TrustServerVerifier {
    /// Check servers with `validator`, then `hostname`.
    pub fn new(validator: TrustValidator, hostname: HostnameVerifier) -> Self {
        Self::with_provider(validator, hostname, default_provider())
    }

    /// Like [`Self::new`] with an explicit crypto provider.
    pub fn with_provider(
        validator: TrustValidator,
        hostname: HostnameVerifier,
        provider: Arc<CryptoProvider>,
    ) -> Self {
        Self {
            validator,
            hostname,
            provider,
            peer_addr: None,
            peer_host: None,
        }
    }

    /// Remote address reported to validators through the transport handle.
    #[must_use]
    pub fn with_peer_addr(mut self, peer_addr: SocketAddr) -> Self {
        self.peer_addr = Some(peer_addr);
        self
    }

    /// Host the connection was actually opened to.
    ///
    /// The basic hostname verifier compares the requested server name with
    /// this value; without it, that verifier rejects every server.
    #[must_use]
    pub fn with_peer_host(mut self, peer_host: impl Into<String>) -> Self {
        self.peer_host = Some(peer_host.into());
        self
    }

    /// Crypto provider for handshake signatures.
    pub fn provider(&self) -> &Arc<CryptoProvider> {
        &self.provider
    }
}

impl ServerCertVerifier for TrustServerVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        let chain = full_chain(end_entity, intermediates);
        let host = server_name_str(server_name);
        let transport = TransportHandle {
            server_name: Some(host.clone()),
            peer_addr: self.peer_addr,
        };
        let ctx = ValidationContext::new(PeerRole::Server, &chain, auth_type_of(end_entity))
            .with_transport(&transport);

        self.validator
            .validate(&ctx)
            .map_err(|rejection| rejection.to_tls_error())?;

        let mut hostname_ctx = HostnameContext::new(&host, &chain);
        if let Some(peer_host) = &self.peer_host {
            hostname_ctx = hostname_ctx.with_peer_host(peer_host);
        }
        if !self.hostname.verify(&hostname_ctx) {
            debug!(server_name = %host, "Server certificate does not match the requested name");
            return Err(rustls::Error::InvalidCertificate(
                CertificateError::NotValidForName,
            ));
        }

        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Config builders
// ─────────────────────────────────────────────────────────────────────────────

/// rustls server config presenting `certs`/`key` and checking clients with `verifier`.
pub fn build_server_config(
    certs: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
    verifier: Arc<TrustClientVerifier>,
) -> Result<ServerConfig> {
    let config = ServerConfig::builder_with_provider(Arc::clone(verifier.provider()))
        .with_safe_default_protocol_versions()?
        .with_client_cert_verifier(verifier)
        .with_single_cert(certs, key)?;
    Ok(config)
}

/// rustls client config checking servers with `verifier`, optionally
/// presenting a client identity.
pub fn build_client_config(
    verifier: Arc<TrustServerVerifier>,
    identity: Option<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)>,
) -> Result<ClientConfig> {
    let builder = ClientConfig::builder_with_provider(Arc::clone(verifier.provider()))
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(verifier);
    let config = match identity {
        Some((certs, key)) => builder.with_client_auth_cert(certs, key)?,
        None => builder.with_no_client_auth(),
    };
    Ok(config)
}

fn full_chain<'a>(
    end_entity: &CertificateDer<'a>,
    intermediates: &[CertificateDer<'a>],
) -> Vec<CertificateDer<'a>> {
    iter::once(end_entity.clone())
        .chain(intermediates.iter().cloned())
        .collect()
}

fn server_name_str(name: &ServerName<'_>) -> String {
    match name {
        ServerName::DnsName(dns) => dns.as_ref().to_owned(),
        ServerName::IpAddress(ip) => std::net::IpAddr::from(*ip).to_string(),
        _ => String::new(),
    }
}
