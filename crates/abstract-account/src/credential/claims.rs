//! Claim set types and their wire representation.

use serde::{Deserialize, Serialize};

pub use crate::crypto::verification::Algorithm;

/// Claim name carrying the transaction-binding bytes (standard base64).
pub const BINDING_CLAIM: &str = "transaction_hash";

/// Structured view of a decoded credential.
///
/// Produced by the parser, consumed by the verifier, then dropped. Nothing
/// here has been checked against a trust anchor yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedClaimSet {
    pub issuer: String,
    pub subject: String,
    pub audience: Vec<String>,
    pub not_before: u64,
    pub expiry: u64,
    pub issued_at: Option<u64>,
    pub transaction_binding: Vec<u8>,
    /// Header `kid`, used to narrow which anchor keys are tried.
    pub key_id: Option<String>,
    pub algorithm: Algorithm,
    /// `header.payload` exactly as received; the signed message.
    pub signing_input: Vec<u8>,
    pub signature: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Header {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

/// `aud` is either a single string or an array of strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum AudienceClaim {
    One(String),
    Many(Vec<String>),
}

impl AudienceClaim {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(a) => vec![a],
            Self::Many(v) => v,
        }
    }
}

/// Payload as it appears on the wire. Every field is optional here so the
/// parser can report which mandatory claim is missing.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct WireClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<AudienceClaim>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    #[serde(
        rename = "transaction_hash",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub transaction_hash: Option<String>,
}
