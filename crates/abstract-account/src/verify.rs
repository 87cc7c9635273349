//! Claim verification: deciding whether a parsed credential authorizes
//! one specific transaction.
//!
//! Checks run in a fixed order and stop at the first failure:
//! 1. Signature against one of the anchor's keys (`InvalidSignature`)
//! 2. Validity window, inclusive at both ends (`CredentialNotYetValid` / `CredentialExpired`)
//! 3. Subject equality and audience membership (`ClaimMismatch`)
//! 4. Transaction binding equality (`ReplayOrBindingMismatch`)

use subtle::ConstantTimeEq;

use crate::anchor::TrustAnchor;
use crate::credential::ParsedClaimSet;
use crate::error::{AuthError, Result};

/// What the authorizing side expects the credential to say.
#[derive(Debug, Clone, Copy)]
pub struct ExpectedClaims<'a> {
    pub subject: &'a str,
    pub audience: &'a str,
    /// Computed by the caller from the transaction being authorized.
    pub transaction_binding: &'a [u8],
}

/// A credential that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClaims {
    pub issuer: String,
    pub subject: String,
    /// Id of the anchor key whose signature verified.
    pub key_id: String,
    pub expiry: u64,
}

/// Verify a parsed claim set against a trust anchor at time `now` (Unix seconds).
pub fn verify_claims(
    claims: &ParsedClaimSet,
    anchor: &TrustAnchor,
    expected: &ExpectedClaims<'_>,
    now: u64,
) -> Result<VerifiedClaims> {
    // 1. Signature
    let key_id = check_signature(claims, anchor)?;

    // 2. Time window
    if now < claims.not_before {
        return Err(AuthError::CredentialNotYetValid);
    }
    if now > claims.expiry {
        return Err(AuthError::CredentialExpired);
    }

    // 3. Subject / audience
    if claims.subject != expected.subject {
        return Err(AuthError::ClaimMismatch(format!(
            "subject '{}' is not the authenticator's subject",
            claims.subject
        )));
    }
    if !claims.audience.iter().any(|a| a == expected.audience) {
        return Err(AuthError::ClaimMismatch(format!(
            "audience '{}' not present",
            expected.audience
        )));
    }

    // 4. Transaction binding
    let bound: bool = claims
        .transaction_binding
        .as_slice()
        .ct_eq(expected.transaction_binding)
        .into();
    if !bound {
        return Err(AuthError::ReplayOrBindingMismatch);
    }

    Ok(VerifiedClaims {
        issuer: claims.issuer.clone(),
        subject: claims.subject.clone(),
        key_id,
        expiry: claims.expiry,
    })
}

fn check_signature(claims: &ParsedClaimSet, anchor: &TrustAnchor) -> Result<String> {
    if claims.issuer != anchor.issuer {
        return Err(AuthError::InvalidSignature);
    }
    anchor
        .candidate_keys(claims.key_id.as_deref())
        .filter(|k| k.key.algorithm() == claims.algorithm)
        .find(|k| {
            k.key
                .verify(claims.algorithm, &claims.signing_input, &claims.signature)
                .is_ok()
        })
        .map(|k| k.key_id.clone())
        .ok_or(AuthError::InvalidSignature)
}
