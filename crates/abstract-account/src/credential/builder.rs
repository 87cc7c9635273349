//! Credential issuance.
//!
//! Builds and signs a compact credential the way an external identity
//! provider would. Used by off-chain tooling, the CLI and tests.

use crate::crypto::encoding::{b64_encode, b64url_encode};
use crate::crypto::keys::Ed25519KeyPair;
use crate::crypto::rs256::RsaKeyPair;
use crate::crypto::signing;
use crate::error::{AuthError, Result};

use super::claims::{Algorithm, AudienceClaim, Header, WireClaims};

/// Builder for signed credentials.
pub struct CredentialBuilder {
    issuer: String,
    subject: String,
    audience: Vec<String>,
    not_before: Option<u64>,
    expiry: Option<u64>,
    issued_at: Option<u64>,
    transaction_binding: Vec<u8>,
    include_key_id: bool,
}

impl CredentialBuilder {
    /// Start a credential from `issuer` about `subject`.
    pub fn new(issuer: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            subject: subject.into(),
            audience: Vec::new(),
            not_before: None,
            expiry: None,
            issued_at: None,
            transaction_binding: Vec::new(),
            include_key_id: true,
        }
    }

    /// Add an audience.
    pub fn audience(mut self, aud: impl Into<String>) -> Self {
        self.audience.push(aud.into());
        self
    }

    /// Set the validity window `[not_before, expiry]` in Unix seconds.
    pub fn valid_between(mut self, not_before: u64, expiry: u64) -> Self {
        self.not_before = Some(not_before);
        self.expiry = Some(expiry);
        self
    }

    /// Valid from `now - skew` until `now + ttl`.
    pub fn valid_around(self, now: u64, skew: u64, ttl: u64) -> Self {
        self.valid_between(now.saturating_sub(skew), now.saturating_add(ttl))
            .issued_at(now.saturating_sub(skew))
    }

    pub fn issued_at(mut self, iat: u64) -> Self {
        self.issued_at = Some(iat);
        self
    }

    /// Bind the credential to one authorization.
    pub fn transaction_binding(mut self, binding: impl Into<Vec<u8>>) -> Self {
        self.transaction_binding = binding.into();
        self
    }

    /// Omit the `kid` header; verifiers then try every anchor key.
    pub fn without_key_id(mut self) -> Self {
        self.include_key_id = false;
        self
    }

    /// Sign with Ed25519 (`EdDSA`) and encode the credential.
    pub fn sign(self, issuer_key: &Ed25519KeyPair) -> Result<String> {
        let signing_input = self.signing_input(Algorithm::EdDsa, issuer_key.key_id())?;
        let signature = signing::sign(issuer_key.signing_key(), signing_input.as_bytes());
        Ok(format!("{signing_input}.{}", b64url_encode(signature)))
    }

    /// Sign with RSA (`RS256`) and encode the credential.
    pub fn sign_rs256(self, issuer_key: &RsaKeyPair) -> Result<String> {
        let signing_input = self.signing_input(Algorithm::Rs256, issuer_key.key_id())?;
        let signature = issuer_key.sign(signing_input.as_bytes())?;
        Ok(format!("{signing_input}.{}", b64url_encode(signature)))
    }

    /// `base64url(header) "." base64url(payload)`
    fn signing_input(self, algorithm: Algorithm, key_id: String) -> Result<String> {
        if self.audience.is_empty() {
            return Err(AuthError::InvalidRequest("no audience specified".into()));
        }
        if self.transaction_binding.is_empty() {
            return Err(AuthError::InvalidRequest(
                "no transaction binding specified".into(),
            ));
        }
        let (Some(nbf), Some(exp)) = (self.not_before, self.expiry) else {
            return Err(AuthError::InvalidRequest("no validity window specified".into()));
        };
        if nbf > exp {
            return Err(AuthError::InvalidRequest(
                "not_before is after expiry".into(),
            ));
        }

        let header = Header {
            alg: algorithm.as_str().to_string(),
            typ: Some("JWT".to_string()),
            kid: self.include_key_id.then_some(key_id),
        };
        let claims = WireClaims {
            iss: Some(self.issuer),
            sub: Some(self.subject),
            aud: Some(AudienceClaim::Many(self.audience)),
            exp: Some(exp),
            nbf: Some(nbf),
            iat: self.issued_at,
            transaction_hash: Some(b64_encode(&self.transaction_binding)),
        };

        let header_json = serde_json::to_vec(&header)
            .map_err(|e| AuthError::InvalidRequest(format!("header encoding failed: {e}")))?;
        let claims_json = serde_json::to_vec(&claims)
            .map_err(|e| AuthError::InvalidRequest(format!("claims encoding failed: {e}")))?;
        Ok(format!("{}.{}", b64url_encode(header_json), b64url_encode(claims_json)))
    }
}
