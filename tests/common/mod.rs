//! Shared rcgen fixtures for integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, Issuer,
    KeyPair, SanType, string::Ia5String,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};

/// A generated certificate with its private key.
pub struct Identity {
    pub der: CertificateDer<'static>,
    pub pem: String,
    key_der: Vec<u8>,
}

impl Identity {
    pub fn key(&self) -> PrivateKeyDer<'static> {
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.key_der.clone()))
    }
}

/// A generated CA able to sign leaves.
pub struct TestCa {
    pub cert: Identity,
    issuer: Issuer<'static, KeyPair>,
}

pub fn dns(name: &str) -> SanType {
    SanType::DnsName(Ia5String::try_from(name).unwrap())
}

fn params(cn: &str, sans: &[SanType]) -> CertificateParams {
    let mut params = CertificateParams::default();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, cn);
    params.distinguished_name = dn;
    params.subject_alt_names = sans.to_vec();
    params
}

pub fn ca(cn: &str) -> TestCa {
    let key = KeyPair::generate().unwrap();
    let key_der = key.serialize_der();
    let mut ca_params = params(cn, &[]);
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let cert = ca_params.self_signed(&key).unwrap();
    TestCa {
        cert: Identity {
            der: cert.der().clone(),
            pem: cert.pem(),
            key_der,
        },
        issuer: Issuer::new(ca_params, key),
    }
}

impl TestCa {
    pub fn leaf(&self, cn: &str, sans: &[SanType]) -> Identity {
        let key = KeyPair::generate().unwrap();
        let cert = params(cn, sans).signed_by(&key, &self.issuer).unwrap();
        Identity {
            der: cert.der().clone(),
            pem: cert.pem(),
            key_der: key.serialize_der(),
        }
    }
}

pub fn self_signed(cn: &str, sans: &[SanType]) -> Identity {
    let key = KeyPair::generate().unwrap();
    let cert = params(cn, sans).self_signed(&key).unwrap();
    Identity {
        der: cert.der().clone(),
        pem: cert.pem(),
        key_der: key.serialize_der(),
    }
}

/// In-memory sink for a `tracing-subscriber` fmt layer.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Subscriber writing plain-text events at `debug` and above into `buffer`.
pub fn capture_subscriber(buffer: &LogBuffer) -> impl tracing::Subscriber + Send + Sync {
    let buffer = buffer.clone();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || buffer.clone())
        .finish()
}
