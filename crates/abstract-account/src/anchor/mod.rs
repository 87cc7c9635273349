//! Trust anchors: the verification keys trusted for each credential issuer.
//!
//! The anchor module provides:
//! - Key sets and their published JSON document form
//! - The [`KeySource`] seam to external key material
//! - [`TrustAnchorResolver`], the shared, rotation-aware anchor cache

pub mod keyset;
pub mod resolver;
pub mod source;

pub use keyset::{AnchorKey, KeySet};
pub use resolver::TrustAnchorResolver;
pub use source::{KeySource, StaticKeySource};

/// The key material trusted for one issuer at one rotation epoch.
///
/// Read-only once built; a rotation replaces the whole anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustAnchor {
    pub issuer: String,
    pub keys: Vec<AnchorKey>,
    pub rotation_epoch: u64,
    /// When the keys were fetched from the source (Unix seconds).
    pub fetched_at: u64,
}

impl TrustAnchor {
    pub fn from_key_set(issuer: impl Into<String>, set: KeySet, fetched_at: u64) -> Self {
        Self {
            issuer: issuer.into(),
            keys: set.keys,
            rotation_epoch: set.rotation_epoch,
            fetched_at,
        }
    }

    /// Keys a credential should be checked against: those matching `kid`
    /// when one is given, otherwise all of them.
    pub fn candidate_keys<'a>(
        &'a self,
        kid: Option<&'a str>,
    ) -> impl Iterator<Item = &'a AnchorKey> + 'a {
        self.keys
            .iter()
            .filter(move |k| kid.map_or(true, |kid| k.key_id == kid))
    }
}
