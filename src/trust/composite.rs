use rustls::pki_types::CertificateDer;

use super::{Rejection, TrustValidator, ValidationContext, Verdict, extend_unique};

/// Accepts a chain if any member accepts it.
///
/// Members are tried in order and the first acceptance wins. Nested
/// composites are flattened on construction, so `members()` never contains
/// another composite.
#[derive(Debug)]
pub struct CompositeTrustValidator {
    members: Vec<TrustValidator>,
}

impl CompositeTrustValidator {
    /// Combine `members`, flattening nested composites in order.
    pub fn new(members: impl IntoIterator<Item = TrustValidator>) -> Self {
        let mut flat = Vec::new();
        for member in members {
            flatten_into(member, &mut flat);
        }
        Self { members: flat }
    }

    /// Flattened members, in evaluation order.
    pub fn members(&self) -> &[TrustValidator] {
        &self.members
    }

    /// Accept on the first member that accepts; otherwise report every reason.
    pub fn validate(&self, ctx: &ValidationContext<'_>) -> Verdict {
        let mut reasons = Vec::with_capacity(self.members.len());
        for member in &self.members {
            match member.validate(ctx) {
                Ok(()) => return Ok(()),
                Err(reason) => reasons.push(reason),
            }
        }
        Err(Rejection::AllRejected(reasons))
    }

    /// Union of the members' issuers.
    pub fn issuers(&self) -> Vec<CertificateDer<'static>> {
        let mut all = Vec::new();
        for member in &self.members {
            extend_unique(&mut all, member.issuers());
        }
        all
    }
}

fn flatten_into(member: TrustValidator, out: &mut Vec<TrustValidator>) {
    match member {
        TrustValidator::Composite(inner) => {
            for m in inner.members() {
                flatten_into(m.clone(), out);
            }
        }
        other => out.push(other),
    }
}
