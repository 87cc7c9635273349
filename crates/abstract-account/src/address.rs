//! Predictable account addresses.
//!
//! An account's address is a pure function of the authenticator contract's
//! code hash, the creator, a creator-chosen salt and the instantiation
//! arguments, so it can be computed (and funded) before the account exists:
//!
//! ```text
//! key  = len(code) || code || len(creator) || creator
//!     || len(salt) || salt || len(init)    || init        (len = u64 big-endian)
//! addr = SHA-256( SHA-256("module") || "wasm" || 0x00 || key )
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AuthError, Result};

/// Address type prefix hashed into every module-derived address.
const ADDRESS_TYPE: &[u8] = b"module";
/// Deriving module name, zero-terminated on use.
const MODULE_NAME: &[u8] = b"wasm";

/// SHA-256 content hash of an authenticator contract's code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeFingerprint(pub [u8; 32]);

impl CodeFingerprint {
    /// Fingerprint raw contract code.
    pub fn of_code(code: &[u8]) -> Self {
        Self(Sha256::digest(code).into())
    }

    /// Parse the hex form reported by code-info queries.
    pub fn from_hex(s: &str) -> Result<Self> {
        let raw = hex::decode(s.trim())
            .map_err(|e| AuthError::InvalidRequest(format!("invalid code hash hex: {e}")))?;
        let arr: [u8; 32] = raw
            .try_into()
            .map_err(|_| AuthError::InvalidRequest("code hash must be 32 bytes".into()))?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for CodeFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Raw address bytes of the creating account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub Vec<u8>);

impl AccountId {
    pub fn from_hex(s: &str) -> Result<Self> {
        let raw = hex::decode(s.trim())
            .map_err(|e| AuthError::InvalidRequest(format!("invalid account id hex: {e}")))?;
        if raw.is_empty() {
            return Err(AuthError::InvalidRequest("account id is empty".into()));
        }
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// A 32-byte account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountAddress(pub [u8; 32]);

impl AccountAddress {
    pub fn from_hex(s: &str) -> Result<Self> {
        let raw = hex::decode(s.trim())
            .map_err(|e| AuthError::InvalidRequest(format!("invalid address hex: {e}")))?;
        let arr: [u8; 32] = raw
            .try_into()
            .map_err(|_| AuthError::InvalidRequest("address must be 32 bytes".into()))?;
        Ok(Self(arr))
    }

    /// Raw bytes; also the default transaction-binding value at registration.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Derive the address an account will receive when instantiated.
pub fn derive(
    code_fingerprint: &CodeFingerprint,
    creator: &AccountId,
    salt: &[u8],
    init_args_fingerprint: &[u8],
) -> AccountAddress {
    let mut key = Vec::with_capacity(
        32 + creator.0.len() + salt.len() + init_args_fingerprint.len() + 4 * 8,
    );
    for part in [
        code_fingerprint.as_bytes(),
        creator.as_bytes(),
        salt,
        init_args_fingerprint,
    ] {
        key.extend_from_slice(&(part.len() as u64).to_be_bytes());
        key.extend_from_slice(part);
    }

    let type_hash = Sha256::digest(ADDRESS_TYPE);
    let mut hasher = Sha256::new();
    hasher.update(type_hash);
    hasher.update(MODULE_NAME);
    hasher.update([0u8]);
    hasher.update(&key);
    AccountAddress(hasher.finalize().into())
}
