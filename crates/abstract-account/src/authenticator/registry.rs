//! Per-account authenticator registry.
//!
//! Indices are assigned in increasing order and never reused, so a
//! credential naming index `n` can only ever refer to the authenticator that
//! was registered as `n`. The registry refuses to drop its last entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};

use super::{Authenticator, AuthenticatorRecord};

/// Ordered collection of one account's authenticators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatorRegistry {
    records: BTreeMap<u32, Authenticator>,
    /// Lowest index that has never been assigned.
    next_index: u32,
}

impl AuthenticatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an authenticator under the next free index.
    pub fn add(&mut self, authenticator: Authenticator) -> Result<u32> {
        let index = self.next_index;
        self.add_with_index(index, authenticator)
    }

    /// Register an authenticator under a caller-chosen index.
    ///
    /// The index must not have been assigned before, including to an
    /// authenticator that was later removed.
    pub fn add_with_index(&mut self, index: u32, authenticator: Authenticator) -> Result<u32> {
        authenticator.validate()?;
        if index < self.next_index {
            return Err(AuthError::InvalidRequest(format!(
                "authenticator index {index} already assigned (next free is {})",
                self.next_index
            )));
        }
        let next = index
            .checked_add(1)
            .ok_or_else(|| AuthError::InvalidRequest("authenticator index space exhausted".into()))?;
        self.records.insert(index, authenticator);
        self.next_index = next;
        Ok(index)
    }

    /// Remove an authenticator. The last remaining one cannot be removed.
    pub fn remove(&mut self, index: u32) -> Result<AuthenticatorRecord> {
        if !self.records.contains_key(&index) {
            return Err(AuthError::NotFound(format!("authenticator {index}")));
        }
        if self.records.len() == 1 {
            return Err(AuthError::LastAuthenticatorRemoval);
        }
        let authenticator = self
            .records
            .remove(&index)
            .ok_or_else(|| AuthError::NotFound(format!("authenticator {index}")))?;
        Ok(AuthenticatorRecord {
            index,
            authenticator,
        })
    }

    pub fn get(&self, index: u32) -> Result<AuthenticatorRecord> {
        self.records
            .get(&index)
            .map(|a| AuthenticatorRecord {
                index,
                authenticator: a.clone(),
            })
            .ok_or_else(|| AuthError::NotFound(format!("authenticator {index}")))
    }

    /// Iterate in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Authenticator)> + '_ {
        self.records.iter().map(|(&index, a)| (index, a))
    }

    /// All records in index order.
    pub fn records(&self) -> Vec<AuthenticatorRecord> {
        self.iter()
            .map(|(index, a)| AuthenticatorRecord {
                index,
                authenticator: a.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn next_index(&self) -> u32 {
        self.next_index
    }
}
