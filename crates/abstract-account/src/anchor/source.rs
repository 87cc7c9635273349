//! Key sources: where trust anchors come from.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::error::{AuthError, Result};

use super::keyset::{AnchorKey, KeySet};

/// External key material, consulted on a resolver cache miss.
///
/// Implementations may block (e.g. fetch a published key-set document);
/// the resolver bounds every call with its fetch timeout. An issuer the
/// source does not know is an error, never an empty key set.
pub trait KeySource: Send + Sync {
    fn fetch(&self, issuer: &str) -> Result<KeySet>;
}

/// In-memory key source, populated by the operator.
#[derive(Default)]
pub struct StaticKeySource {
    sets: RwLock<HashMap<String, KeySet>>,
    fetches: AtomicUsize,
}

impl StaticKeySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish (or replace) the key set for an issuer.
    pub fn publish(&self, issuer: impl Into<String>, set: KeySet) {
        if let Ok(mut sets) = self.sets.write() {
            sets.insert(issuer.into(), set);
        }
    }

    /// Replace an issuer's keys under the next rotation epoch.
    ///
    /// Returns the new epoch, which callers pass on to
    /// [`TrustAnchorResolver::notify_rotation`](super::TrustAnchorResolver::notify_rotation).
    pub fn rotate(&self, issuer: &str, keys: Vec<AnchorKey>) -> Result<u64> {
        let mut sets = self
            .sets
            .write()
            .map_err(|_| AuthError::UnknownIssuer(issuer.to_string()))?;
        let epoch = sets
            .get(issuer)
            .map(|s| s.rotation_epoch + 1)
            .ok_or_else(|| AuthError::UnknownIssuer(issuer.to_string()))?;
        sets.insert(issuer.to_string(), KeySet::new(keys, epoch));
        Ok(epoch)
    }

    /// Stop vouching for an issuer.
    pub fn remove(&self, issuer: &str) {
        if let Ok(mut sets) = self.sets.write() {
            sets.remove(issuer);
        }
    }

    /// Number of fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl KeySource for StaticKeySource {
    fn fetch(&self, issuer: &str) -> Result<KeySet> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.sets
            .read()
            .map_err(|_| AuthError::UnknownIssuer(issuer.to_string()))?
            .get(issuer)
            .cloned()
            .ok_or_else(|| AuthError::UnknownIssuer(issuer.to_string()))
    }
}
