//! Credential parsing.
//!
//! Decoding is strict: an unsupported algorithm, a missing mandatory claim
//! or any encoding fault is `MalformedCredential`. No field is defaulted and
//! no signature is checked here.

use crate::crypto::encoding::{b64_decode, b64url_decode};
use crate::error::{AuthError, Result};

use super::claims::{Algorithm, Header, ParsedClaimSet, WireClaims, BINDING_CLAIM};

/// Parser with a size bound on the raw credential.
#[derive(Debug, Clone, Copy)]
pub struct CredentialParser {
    max_bytes: usize,
}

impl Default for CredentialParser {
    fn default() -> Self {
        Self::new(crate::config::EngineConfig::default().max_credential_bytes)
    }
}

impl CredentialParser {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn parse(&self, raw: &[u8]) -> Result<ParsedClaimSet> {
        if raw.is_empty() {
            return Err(malformed("empty credential"));
        }
        if raw.len() > self.max_bytes {
            return Err(malformed(format!(
                "credential is {} bytes, limit is {}",
                raw.len(),
                self.max_bytes
            )));
        }

        let text = std::str::from_utf8(raw).map_err(|_| malformed("credential is not UTF-8"))?;
        let text = text.trim();
        let mut segments = text.split('.');
        let (Some(header_b64), Some(payload_b64), Some(sig_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(malformed("expected three dot-separated segments"));
        };

        let header: Header = decode_json(header_b64, "header")?;
        let algorithm = Algorithm::from_name(&header.alg)
            .ok_or_else(|| malformed(format!("unsupported algorithm '{}'", header.alg)))?;

        let claims: WireClaims = decode_json(payload_b64, "payload")?;

        let signature = b64url_decode(sig_b64)
            .map_err(|e| malformed(format!("signature segment is not base64url: {e}")))?;
        if !algorithm.accepts_signature_len(signature.len()) {
            return Err(malformed(format!(
                "{algorithm} signature cannot be {} bytes",
                signature.len()
            )));
        }

        let issuer = required_string(claims.iss, "iss")?;
        let subject = required_string(claims.sub, "sub")?;
        let audience = claims
            .aud
            .ok_or_else(|| missing("aud"))?
            .into_vec();
        if audience.is_empty() || audience.iter().any(|a| a.is_empty()) {
            return Err(malformed("aud must name at least one non-empty audience"));
        }
        let expiry = claims.exp.ok_or_else(|| missing("exp"))?;
        let not_before = claims.nbf.ok_or_else(|| missing("nbf"))?;
        let binding_b64 = claims.transaction_hash.ok_or_else(|| missing(BINDING_CLAIM))?;
        let transaction_binding = b64_decode(&binding_b64)
            .map_err(|e| malformed(format!("{BINDING_CLAIM} is not base64: {e}")))?;
        if transaction_binding.is_empty() {
            return Err(malformed(format!("{BINDING_CLAIM} is empty")));
        }

        let signing_len = header_b64.len() + 1 + payload_b64.len();
        Ok(ParsedClaimSet {
            issuer,
            subject,
            audience,
            not_before,
            expiry,
            issued_at: claims.iat,
            transaction_binding,
            key_id: header.kid,
            algorithm,
            signing_input: text.as_bytes()[..signing_len].to_vec(),
            signature,
        })
    }
}

/// Parse with the default size bound.
pub fn parse(raw: &[u8]) -> Result<ParsedClaimSet> {
    CredentialParser::default().parse(raw)
}

fn decode_json<T: serde::de::DeserializeOwned>(segment: &str, what: &str) -> Result<T> {
    let bytes = b64url_decode(segment)
        .map_err(|e| malformed(format!("{what} segment is not base64url: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| malformed(format!("{what} is not valid JSON: {e}")))
}

fn required_string(value: Option<String>, claim: &str) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        Some(_) => Err(malformed(format!("claim '{claim}' is empty"))),
        None => Err(missing(claim)),
    }
}

fn missing(claim: &str) -> AuthError {
    malformed(format!("missing claim '{claim}'"))
}

fn malformed(msg: impl Into<String>) -> AuthError {
    AuthError::MalformedCredential(msg.into())
}
