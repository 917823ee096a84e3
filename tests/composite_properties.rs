//! Combination semantics of the builder and composite validator.
//!
//! - any-of acceptance over static sources
//! - accept-all promotion
//! - flattening and issuer union

mod common;

use std::sync::LazyLock;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rustls::pki_types::CertificateDer;

use common::{ca, dns};
use mtls_trust::trust::{
    CompositeTrustValidator, PeerRole, TrustStore, TrustValidator, ValidationContext,
    ValidatorKind, combine,
};

const AUTHORITIES: usize = 4;

struct Pki {
    anchors: Vec<CertificateDer<'static>>,
    /// One leaf per CA, same index.
    leaves: Vec<CertificateDer<'static>>,
    bases: Vec<TrustValidator>,
}

static PKI: LazyLock<Pki> = LazyLock::new(|| {
    let cas: Vec<_> = (0..AUTHORITIES).map(|i| ca(&format!("ca-{i}"))).collect();
    let leaves = cas
        .iter()
        .enumerate()
        .map(|(i, ca)| ca.leaf(&format!("svc-{i}"), &[dns(&format!("svc-{i}.local"))]).der)
        .collect();
    let anchors: Vec<_> = cas.iter().map(|ca| ca.cert.der.clone()).collect();
    let bases = anchors
        .iter()
        .map(|anchor| {
            TrustValidator::from_trust_store(&TrustStore::from_certificates([anchor.clone()]))
                .unwrap()
        })
        .collect();
    Pki {
        anchors,
        leaves,
        bases,
    }
});

fn accepts(validator: &TrustValidator, leaf: &CertificateDer<'static>, role: PeerRole) -> bool {
    let chain = [leaf.clone()];
    validator
        .validate(&ValidationContext::new(role, &chain, "EC"))
        .is_ok()
}

fn any_role() -> impl Strategy<Value = PeerRole> {
    prop_oneof![Just(PeerRole::Client), Just(PeerRole::Server)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// A composite of static validators accepts exactly when some member does.
    #[test]
    fn composite_accepts_iff_some_member_accepts(
        members in prop::collection::vec(0..AUTHORITIES, 1..6),
        presented in 0..AUTHORITIES,
        role in any_role(),
    ) {
        let pki = &*PKI;
        let validators: Vec<_> = members.iter().map(|&i| pki.bases[i].clone()).collect();
        let combined = combine(validators.clone()).unwrap();
        let leaf = &pki.leaves[presented];

        let expected = validators.iter().any(|v| accepts(v, leaf, role));
        prop_assert_eq!(accepts(&combined, leaf, role), expected);
        prop_assert_eq!(expected, members.contains(&presented));
    }

    /// Any Unsafe or Dummy source makes the combination accept everything.
    #[test]
    fn accept_all_member_accepts_everything(
        members in prop::collection::vec(0..AUTHORITIES, 0..5),
        insert_at in 0usize..6,
        use_dummy in any::<bool>(),
        presented in 0..AUTHORITIES,
        role in any_role(),
    ) {
        let pki = &*PKI;
        let mut validators: Vec<_> = members.iter().map(|&i| pki.bases[i].clone()).collect();
        let accept_all = if use_dummy { TrustValidator::Dummy } else { TrustValidator::Unsafe };
        validators.insert(insert_at.min(validators.len()), accept_all);

        let combined = combine(validators).unwrap();

        prop_assert!(combined.is_accept_all());
        prop_assert!(accepts(&combined, &pki.leaves[presented], role));
    }
}

#[test]
fn builder_with_many_sources_flattens_and_unions_issuers() {
    // GIVEN: nested composites over all authorities
    let pki = &*PKI;
    let inner = CompositeTrustValidator::new(pki.bases[2..].iter().cloned());
    let middle = CompositeTrustValidator::new([pki.bases[1].clone(), inner.into()]);

    // WHEN: building from a base plus the nested composite
    let built = TrustValidator::builder()
        .with_trust_validator(pki.bases[0].clone())
        .with_trust_validator(middle.into())
        .build()
        .unwrap();

    // THEN: one flat composite whose issuers are every CA once
    let TrustValidator::Composite(composite) = &built else {
        panic!("expected composite, got {}", built.kind());
    };
    assert_eq!(composite.members().len(), AUTHORITIES);
    assert!(
        composite
            .members()
            .iter()
            .all(|m| m.kind() != ValidatorKind::Composite)
    );
    assert_eq!(built.issuers(), pki.anchors);
}

#[test]
fn unsafe_is_preferred_over_dummy() {
    let combined = combine([TrustValidator::Dummy, PKI.bases[0].clone(), TrustValidator::Unsafe]).unwrap();
    assert_eq!(combined.kind(), ValidatorKind::Unsafe);
}
