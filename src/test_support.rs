//! rcgen-backed certificate fixtures for unit tests.

use std::net::IpAddr;

use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, Issuer,
    KeyPair, SanType, string::Ia5String,
};
use rustls::pki_types::CertificateDer;

use crate::trust::{PeerRole, ValidationContext};

/// A generated certificate in DER and PEM form.
pub struct Fixture {
    pub der: CertificateDer<'static>,
    pub pem: String,
}

/// A generated CA that can sign leaves.
pub struct CaFixture {
    pub cert: Fixture,
    issuer: Issuer<'static, KeyPair>,
}

pub fn dns_san(s: &str) -> SanType {
    SanType::DnsName(Ia5String::try_from(s).unwrap())
}

pub fn ip_san(ip: IpAddr) -> SanType {
    SanType::IpAddress(ip)
}

fn params(cn: &str, sans: &[SanType]) -> CertificateParams {
    let mut params = CertificateParams::default();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, cn);
    params.distinguished_name = dn;
    params.subject_alt_names = sans.to_vec();
    params
}

/// Self-signed end-entity certificate (not a CA).
pub fn self_signed(cn: &str, sans: &[SanType]) -> Fixture {
    let key = KeyPair::generate().unwrap();
    let cert = params(cn, sans).self_signed(&key).unwrap();
    Fixture {
        der: cert.der().clone(),
        pem: cert.pem(),
    }
}

/// Self-signed root CA.
pub fn ca(cn: &str) -> CaFixture {
    let key = KeyPair::generate().unwrap();
    let mut ca_params = params(cn, &[]);
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let cert = ca_params.self_signed(&key).unwrap();
    CaFixture {
        cert: Fixture {
            der: cert.der().clone(),
            pem: cert.pem(),
        },
        issuer: Issuer::new(ca_params, key),
    }
}

impl CaFixture {
    /// Issue a leaf signed by this CA.
    pub fn leaf(&self, cn: &str, sans: &[SanType]) -> Fixture {
        let key = KeyPair::generate().unwrap();
        let cert = params(cn, sans).signed_by(&key, &self.issuer).unwrap();
        Fixture {
            der: cert.der().clone(),
            pem: cert.pem(),
        }
    }
}

/// Client-role context over `chain` with the EC auth type rcgen produces.
pub fn client_ctx<'a>(chain: &'a [CertificateDer<'static>]) -> ValidationContext<'a> {
    ValidationContext::new(PeerRole::Client, chain, "EC")
}

/// Server-role context over `chain`.
pub fn server_ctx<'a>(chain: &'a [CertificateDer<'static>]) -> ValidationContext<'a> {
    ValidationContext::new(PeerRole::Server, chain, "EC")
}
