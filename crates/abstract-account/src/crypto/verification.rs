//! Credential signature algorithms and the public keys that check them.

use std::fmt;

use ed25519_dalek::VerifyingKey;
use rsa::RsaPublicKey;

use crate::crypto::{keys, rs256, signing};
use crate::error::{AuthError, Result};

/// Signature algorithm named by a credential header.
///
/// Only asymmetric algorithms exist here: `none` and the HMAC family have
/// no representation and are rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Ed25519.
    EdDsa,
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    Rs256,
}

impl Algorithm {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "EdDSA" => Some(Self::EdDsa),
            "RS256" => Some(Self::Rs256),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EdDsa => "EdDSA",
            Self::Rs256 => "RS256",
        }
    }

    /// Whether a signature of `len` bytes can belong to this algorithm.
    pub fn accepts_signature_len(self, len: usize) -> bool {
        match self {
            Self::EdDsa => len == 64,
            Self::Rs256 => (rs256::MIN_MODULUS_BITS / 8..=rs256::MAX_MODULUS_BITS / 8).contains(&len),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A public key an issuer signs credentials with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationKey {
    Ed25519(VerifyingKey),
    Rsa(RsaPublicKey),
}

impl VerificationKey {
    /// The one algorithm this key verifies.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::Ed25519(_) => Algorithm::EdDsa,
            Self::Rsa(_) => Algorithm::Rs256,
        }
    }

    /// Id derived from the key material.
    pub fn key_id(&self) -> String {
        match self {
            Self::Ed25519(k) => keys::key_id_for(k),
            Self::Rsa(k) => rs256::key_id_for(k),
        }
    }

    /// Check `signature` over `message`. A key never verifies for an
    /// algorithm other than its own.
    pub fn verify(&self, algorithm: Algorithm, message: &[u8], signature: &[u8]) -> Result<()> {
        match (self, algorithm) {
            (Self::Ed25519(k), Algorithm::EdDsa) => signing::verify(k, message, signature),
            (Self::Rsa(k), Algorithm::Rs256) => rs256::verify(k, message, signature),
            _ => Err(AuthError::InvalidSignature),
        }
    }
}

impl From<VerifyingKey> for VerificationKey {
    fn from(key: VerifyingKey) -> Self {
        Self::Ed25519(key)
    }
}

impl From<RsaPublicKey> for VerificationKey {
    fn from(key: RsaPublicKey) -> Self {
        Self::Rsa(key)
    }
}
