//! Composable trust validators.
//!
//! A [`TrustValidator`] decides whether a peer's certificate chain is trusted.
//! Validators are a closed set of variants that wrap each other:
//!
//! ```text
//!   HotSwappable ─▶ Logging ─▶ Enhanceable ─▶ Composite ─┬▶ Base
//!   (outermost)                                          ├▶ Inflatable ─▶ Base (rebuilt)
//!                                                        └▶ ...
//! ```
//!
//! Use [`TrustValidatorBuilder`] to assemble a stack in the canonical order;
//! [`mutation`] exposes the runtime operations (adding certificates to an
//! inflatable pool, swapping the active delegate).

mod base;
mod builder;
mod capturing;
mod composite;
mod context;
mod enhanceable;
mod inflatable;
mod logging;
pub mod mutation;
mod rejection;
mod store;
mod swappable;

use std::fmt;
use std::sync::Arc;

use rustls::pki_types::CertificateDer;
use tracing::debug;

pub use base::BaseTrustValidator;
pub use builder::{TrustValidatorBuilder, combine};
pub use capturing::{CapturingTrustValidator, CertificateCollector};
pub use composite::CompositeTrustValidator;
pub use context::{PeerRole, TransportHandle, ValidationContext};
pub use enhanceable::EnhanceableTrustValidator;
pub use inflatable::{InflatableOptions, InflatableTrustValidator};
pub use logging::LoggingTrustValidator;
pub use rejection::{Rejection, Verdict};
pub use store::{TrustStore, TrustStoreFormat, ValidationAlgorithm};
pub(crate) use store::default_provider;
pub use swappable::HotSwappableTrustValidator;

use crate::Result;

/// Extra accept predicate consulted by an inflatable pool before chain validation.
pub type TrustPredicate = Arc<dyn Fn(&ValidationContext<'_>) -> bool + Send + Sync>;

/// Custom decision over a context and the validator it enhances.
///
/// The second argument is the wrapped validator so the predicate can fold
/// standard chain validation into its own answer.
pub type TrustEnhancer = Arc<dyn Fn(&ValidationContext<'_>, &TrustValidator) -> bool + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// TrustValidator
// ─────────────────────────────────────────────────────────────────────────────

/// A trust decision component. Cheap to clone; payloads are shared.
#[derive(Clone, Debug)]
pub enum TrustValidator {
    /// Chain validation against fixed anchors.
    Base(Arc<BaseTrustValidator>),
    /// Any-of over several validators.
    Composite(Arc<CompositeTrustValidator>),
    /// Anchor pool that grows at runtime.
    Inflatable(Arc<InflatableTrustValidator>),
    /// Slot whose delegate can be replaced at runtime.
    HotSwappable(Arc<HotSwappableTrustValidator>),
    /// Custom predicate over a base validator.
    Enhanceable(Arc<EnhanceableTrustValidator>),
    /// Logs every decision of the wrapped validator.
    Logging(Arc<LoggingTrustValidator>),
    /// Records presented chains before delegating.
    Capturing(Arc<CapturingTrustValidator>),
    /// Accepts every chain and says so at debug level.
    Unsafe,
    /// Accepts every chain silently.
    Dummy,
}

/// Variant tag of a [`TrustValidator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidatorKind {
    /// [`TrustValidator::Base`]
    Base,
    /// [`TrustValidator::Composite`]
    Composite,
    /// [`TrustValidator::Inflatable`]
    Inflatable,
    /// [`TrustValidator::HotSwappable`]
    HotSwappable,
    /// [`TrustValidator::Enhanceable`]
    Enhanceable,
    /// [`TrustValidator::Logging`]
    Logging,
    /// [`TrustValidator::Capturing`]
    Capturing,
    /// [`TrustValidator::Unsafe`]
    Unsafe,
    /// [`TrustValidator::Dummy`]
    Dummy,
}

impl fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Base => "base",
            Self::Composite => "composite",
            Self::Inflatable => "inflatable",
            Self::HotSwappable => "hot-swappable",
            Self::Enhanceable => "enhanceable",
            Self::Logging => "logging",
            Self::Capturing => "capturing",
            Self::Unsafe => "unsafe",
            Self::Dummy => "dummy",
        };
        f.write_str(name)
    }
}

impl TrustValidator {
    /// Start assembling a validator stack.
    pub fn builder() -> TrustValidatorBuilder {
        TrustValidatorBuilder::new()
    }

    /// Base validator trusting the anchors in `store`.
    pub fn from_trust_store(store: &TrustStore) -> Result<Self> {
        Ok(BaseTrustValidator::new(store)?.into())
    }

    /// Base validator trusting `store` with an explicit validation algorithm.
    pub fn from_trust_store_with_algorithm(
        store: &TrustStore,
        algorithm: &ValidationAlgorithm,
    ) -> Result<Self> {
        Ok(BaseTrustValidator::with_algorithm(store, algorithm)?.into())
    }

    /// Accepts everything. Only for tests and bootstrap tooling.
    pub fn unsafe_trust_all() -> Self {
        Self::Unsafe
    }

    /// Accepts everything without logging.
    pub fn dummy() -> Self {
        Self::Dummy
    }

    /// Empty inflatable pool with default options.
    pub fn inflatable() -> Result<Self> {
        Ok(InflatableTrustValidator::new()?.into())
    }

    /// Wrap `inner` so every decision is logged.
    pub fn logging(inner: TrustValidator) -> Self {
        LoggingTrustValidator::new(inner).into()
    }

    /// Wrap `inner` with a custom decision.
    pub fn enhanceable<F>(inner: TrustValidator, enhancer: F) -> Self
    where
        F: Fn(&ValidationContext<'_>, &TrustValidator) -> bool + Send + Sync + 'static,
    {
        EnhanceableTrustValidator::new(inner, Some(Arc::new(enhancer))).into()
    }

    /// Put `inner` into a swap slot.
    pub fn swappable(inner: TrustValidator) -> Self {
        HotSwappableTrustValidator::new(inner).into()
    }

    /// Record every presented chain into `collector`, then delegate to `inner`
    /// (or accept unconditionally when `inner` is `None`).
    pub fn capturing(collector: CertificateCollector, inner: Option<TrustValidator>) -> Self {
        CapturingTrustValidator::new(collector, inner.unwrap_or(Self::Unsafe)).into()
    }

    /// Variant tag, for logs and structural checks.
    pub fn kind(&self) -> ValidatorKind {
        match self {
            Self::Base(_) => ValidatorKind::Base,
            Self::Composite(_) => ValidatorKind::Composite,
            Self::Inflatable(_) => ValidatorKind::Inflatable,
            Self::HotSwappable(_) => ValidatorKind::HotSwappable,
            Self::Enhanceable(_) => ValidatorKind::Enhanceable,
            Self::Logging(_) => ValidatorKind::Logging,
            Self::Capturing(_) => ValidatorKind::Capturing,
            Self::Unsafe => ValidatorKind::Unsafe,
            Self::Dummy => ValidatorKind::Dummy,
        }
    }

    /// Decide on `ctx` for the role it carries.
    pub fn validate(&self, ctx: &ValidationContext<'_>) -> Verdict {
        match self {
            Self::Base(v) => v.validate(ctx),
            Self::Composite(v) => v.validate(ctx),
            Self::Inflatable(v) => v.validate(ctx),
            Self::HotSwappable(v) => v.validate(ctx),
            Self::Enhanceable(v) => v.validate(ctx),
            Self::Logging(v) => v.validate(ctx),
            Self::Capturing(v) => v.validate(ctx),
            Self::Unsafe => {
                debug!(
                    role = %ctx.role(),
                    subject = %ctx.leaf_subject(),
                    "Accepting certificate without validation"
                );
                Ok(())
            }
            Self::Dummy => Ok(()),
        }
    }

    /// Validate a chain presented by a connecting client.
    pub fn validate_as_client(&self, ctx: &ValidationContext<'_>) -> Verdict {
        self.validate(&ctx.for_role(PeerRole::Client))
    }

    /// Validate a chain presented by a server.
    pub fn validate_as_server(&self, ctx: &ValidationContext<'_>) -> Verdict {
        self.validate(&ctx.for_role(PeerRole::Server))
    }

    /// Anchors this validator currently trusts, de-duplicated.
    pub fn issuers(&self) -> Vec<CertificateDer<'static>> {
        match self {
            Self::Base(v) => v.issuers().to_vec(),
            Self::Composite(v) => v.issuers(),
            Self::Inflatable(v) => v.issuers(),
            Self::HotSwappable(v) => v.delegate().issuers(),
            Self::Enhanceable(v) => v.base().issuers(),
            Self::Logging(v) => v.inner().issuers(),
            Self::Capturing(v) => v.inner().issuers(),
            Self::Unsafe | Self::Dummy => Vec::new(),
        }
    }

    /// `true` for the two accept-everything policies.
    pub fn is_accept_all(&self) -> bool {
        matches!(self, Self::Unsafe | Self::Dummy)
    }

    /// `true` when the trusted set can change after construction.
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::Inflatable(_) | Self::HotSwappable(_) => true,
            Self::Composite(v) => v.members().iter().any(Self::is_dynamic),
            Self::Enhanceable(v) => v.base().is_dynamic(),
            Self::Logging(v) => v.inner().is_dynamic(),
            Self::Capturing(v) => v.inner().is_dynamic(),
            Self::Base(_) | Self::Unsafe | Self::Dummy => false,
        }
    }
}

macro_rules! impl_from_validator {
    ($($variant:ident => $ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for TrustValidator {
                fn from(v: $ty) -> Self {
                    Self::$variant(Arc::new(v))
                }
            }
        )+
    };
}

impl_from_validator! {
    Base => BaseTrustValidator,
    Composite => CompositeTrustValidator,
    Inflatable => InflatableTrustValidator,
    HotSwappable => HotSwappableTrustValidator,
    Enhanceable => EnhanceableTrustValidator,
    Logging => LoggingTrustValidator,
    Capturing => CapturingTrustValidator,
}

/// Append `certs` to `out`, skipping those already present.
pub(crate) fn extend_unique(
    out: &mut Vec<CertificateDer<'static>>,
    certs: impl IntoIterator<Item = CertificateDer<'static>>,
) {
    for cert in certs {
        if !out.contains(&cert) {
            out.push(cert);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
