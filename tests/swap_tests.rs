//! Hot-swapping the active trust policy.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use common::{ca, dns};
use mtls_trust::Error;
use mtls_trust::trust::mutation::swap_trust_validator;
use mtls_trust::trust::{
    PeerRole, TrustStore, TrustValidator, ValidationContext, ValidatorKind, Verdict,
};

fn base_for(anchor: &rustls::pki_types::CertificateDer<'static>) -> TrustValidator {
    TrustValidator::from_trust_store(&TrustStore::from_certificates([anchor.clone()])).unwrap()
}

#[test]
fn concurrent_swaps_never_yield_a_mixed_decision() {
    // GIVEN: two policies that disagree on every chain below
    let (first, second) = (ca("first"), ca("second"));
    let policy_a = TrustValidator::builder()
        .with_trust_store(TrustStore::from_certificates([first.cert.der.clone()]))
        .build()
        .unwrap();
    let policy_b = TrustValidator::builder()
        .with_trust_stores([
            TrustStore::from_certificates([second.cert.der.clone()]),
            TrustStore::new(),
        ])
        .build()
        .unwrap();

    let from_first = [first.leaf("a", &[dns("a.local")]).der];
    let from_second = [second.leaf("b", &[dns("b.local")]).der];

    let expected = |policy: &TrustValidator| -> (Verdict, Verdict) {
        (
            policy.validate(&ValidationContext::new(PeerRole::Client, &from_first, "EC")),
            policy.validate(&ValidationContext::new(PeerRole::Client, &from_second, "EC")),
        )
    };
    let verdicts_a = expected(&policy_a);
    let verdicts_b = expected(&policy_b);
    assert_ne!(verdicts_a.0.is_ok(), verdicts_b.0.is_ok());

    let slot = TrustValidator::builder()
        .with_trust_validator(policy_a.clone())
        .with_swappable(true)
        .build()
        .unwrap();
    let stop = Arc::new(AtomicBool::new(false));

    // WHEN: readers validate while a writer keeps swapping
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let slot = slot.clone();
            let stop = Arc::clone(&stop);
            let (from_first, from_second) = (from_first.clone(), from_second.clone());
            let (verdicts_a, verdicts_b) = (verdicts_a.clone(), verdicts_b.clone());
            thread::spawn(move || {
                let mut checked = 0u32;
                while !stop.load(Ordering::Relaxed) || checked < 50 {
                    let first = slot.validate(&ValidationContext::new(PeerRole::Client, &from_first, "EC"));
                    let second = slot.validate(&ValidationContext::new(PeerRole::Client, &from_second, "EC"));
                    // THEN: each single verdict is exactly one policy's verdict
                    assert!(first == verdicts_a.0 || first == verdicts_b.0, "{first:?}");
                    assert!(second == verdicts_a.1 || second == verdicts_b.1, "{second:?}");
                    checked += 1;
                }
            })
        })
        .collect();

    for i in 0..200 {
        let next = if i % 2 == 0 { &policy_b } else { &policy_a };
        swap_trust_validator(&slot, next.clone()).unwrap();
    }
    stop.store(true, Ordering::Relaxed);
    for reader in readers {
        reader.join().unwrap();
    }

    // AND: the last swap is the one in effect
    let last = (
        slot.validate(&ValidationContext::new(PeerRole::Client, &from_first, "EC")),
        slot.validate(&ValidationContext::new(PeerRole::Client, &from_second, "EC")),
    );
    assert_eq!(last, verdicts_a);
}

#[test]
fn invalid_swap_targets_keep_the_original_delegate() {
    let root = ca("root");
    let slot = TrustValidator::swappable(base_for(&root.cert.der));

    for target in [
        TrustValidator::swappable(TrustValidator::Dummy),
        TrustValidator::inflatable().unwrap(),
    ] {
        let err = swap_trust_validator(&slot, target).unwrap_err();
        assert!(matches!(err, Error::InvalidSwapTarget(_)));
    }

    let TrustValidator::HotSwappable(inner) = &slot else {
        unreachable!()
    };
    assert_eq!(inner.delegate().kind(), ValidatorKind::Base);
    assert_eq!(slot.issuers(), vec![root.cert.der.clone()]);
}

#[test]
fn swapping_a_non_swappable_validator_is_unsupported() {
    let root = ca("root");
    let err = swap_trust_validator(&base_for(&root.cert.der), TrustValidator::Dummy).unwrap_err();
    assert!(matches!(err, Error::UnsupportedOperation(_)));
}
