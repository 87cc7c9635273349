//! Ed25519 key pairs.
//!
//! Issuers sign credentials with these keys; native-signature
//! authenticators hold the public half.

use ed25519_dalek::{SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::crypto::encoding::{b64_decode, b64_encode};
use crate::error::{AuthError, Result};

/// An Ed25519 key pair.
///
/// The secret bytes handed out by [`Ed25519KeyPair::secret_base64`] are
/// zeroized after encoding. The pair needs no `Drop` of its own:
/// `SigningKey` is `ZeroizeOnDrop`.
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl Ed25519KeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Reconstruct a key pair from raw secret bytes.
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Reconstruct a key pair from a base64-encoded secret (as written by `aa keygen`).
    pub fn from_secret_base64(encoded: &str) -> Result<Self> {
        let mut raw = b64_decode(encoded.trim())
            .map_err(|e| AuthError::InvalidRequest(format!("invalid base64 secret key: {e}")))?;
        let bytes: std::result::Result<[u8; 32], _> = raw.as_slice().try_into();
        raw.zeroize();
        let mut bytes =
            bytes.map_err(|_| AuthError::InvalidRequest("secret key must be 32 bytes".into()))?;
        let pair = Self::from_secret_bytes(&bytes);
        bytes.zeroize();
        Ok(pair)
    }

    /// Encode the secret key as base64. Caller is responsible for the string.
    pub fn secret_base64(&self) -> String {
        let mut bytes = self.signing_key.to_bytes();
        let encoded = b64_encode(bytes);
        bytes.zeroize();
        encoded
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Public key as standard base64.
    pub fn public_key_base64(&self) -> String {
        b64_encode(self.verifying_key.to_bytes())
    }

    /// Key id derived from the public key.
    pub fn key_id(&self) -> String {
        key_id_for(&self.verifying_key)
    }
}

/// Derive a stable key id: `ed25519_` + base58 of the first 16 bytes of SHA-256(public key).
pub fn key_id_for(key: &VerifyingKey) -> String {
    let hash = Sha256::digest(key.as_bytes());
    format!("ed25519_{}", bs58::encode(&hash[..16]).into_string())
}

/// Parse a verifying key from raw bytes.
pub fn verifying_key_from_bytes(bytes: &[u8]) -> Result<VerifyingKey> {
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| AuthError::InvalidRequest("public key must be 32 bytes".into()))?;
    VerifyingKey::from_bytes(&arr)
        .map_err(|e| AuthError::InvalidRequest(format!("invalid public key: {e}")))
}

/// Parse a verifying key from standard base64.
pub fn verifying_key_from_base64(encoded: &str) -> Result<VerifyingKey> {
    let raw = b64_decode(encoded.trim())
        .map_err(|e| AuthError::InvalidRequest(format!("invalid base64 public key: {e}")))?;
    verifying_key_from_bytes(&raw)
}
