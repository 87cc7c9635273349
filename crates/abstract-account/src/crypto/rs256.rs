//! RSA keys for RS256 credentials (PKCS#1 v1.5 signatures over SHA-256).
//!
//! Identity providers commonly publish RSA key sets; the engine only ever
//! needs the public half. The key pair exists for issuing tooling and tests.

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::error::{AuthError, Result};

/// Smallest modulus accepted for a verification key.
pub const MIN_MODULUS_BITS: usize = 2048;

/// Largest modulus the `rsa` crate will verify with.
pub const MAX_MODULUS_BITS: usize = 4096;

/// An RSA signing key pair. `RsaPrivateKey` zeroizes itself on drop.
pub struct RsaKeyPair {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl RsaKeyPair {
    /// Generate a new key pair with a `bits`-bit modulus.
    pub fn generate(bits: usize) -> Result<Self> {
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), bits)
            .map_err(|e| AuthError::InvalidRequest(format!("RSA key generation failed: {e}")))?;
        Ok(Self::from_private_key(private_key))
    }

    /// Load a PEM private key, either PKCS#1 (`RSA PRIVATE KEY`) or PKCS#8.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs1_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
            .map_err(|e| AuthError::InvalidRequest(format!("invalid RSA private key: {e}")))?;
        Ok(Self::from_private_key(private_key))
    }

    fn from_private_key(private_key: RsaPrivateKey) -> Self {
        let public_key = private_key.to_public_key();
        Self {
            private_key,
            public_key,
        }
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    pub fn key_id(&self) -> String {
        key_id_for(&self.public_key)
    }

    /// RS256 signature over `message`.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let digest = Sha256::digest(message);
        self.private_key
            .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .map_err(|e| AuthError::InvalidRequest(format!("RSA signing failed: {e}")))
    }
}

/// Verify an RS256 signature. Every failure is `InvalidSignature`.
pub fn verify(key: &RsaPublicKey, message: &[u8], signature: &[u8]) -> Result<()> {
    let digest = Sha256::digest(message);
    key.verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
        .map_err(|_| AuthError::InvalidSignature)
}

/// Build a public key from big-endian modulus and exponent bytes.
pub fn public_key_from_components(modulus: &[u8], exponent: &[u8]) -> Result<RsaPublicKey> {
    let key = RsaPublicKey::new(
        BigUint::from_bytes_be(modulus),
        BigUint::from_bytes_be(exponent),
    )
    .map_err(|e| AuthError::InvalidRequest(format!("invalid RSA public key: {e}")))?;
    if key.size() * 8 < MIN_MODULUS_BITS {
        return Err(AuthError::InvalidRequest(format!(
            "RSA modulus is {} bits, minimum is {MIN_MODULUS_BITS}",
            key.size() * 8
        )));
    }
    Ok(key)
}

/// `rsa_` + base58 of the first 16 bytes of SHA-256(n || e).
pub fn key_id_for(key: &RsaPublicKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.n().to_bytes_be());
    hasher.update(key.e().to_bytes_be());
    let hash = hasher.finalize();
    format!("rsa_{}", bs58::encode(&hash[..16]).into_string())
}
