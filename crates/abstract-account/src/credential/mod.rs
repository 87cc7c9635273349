//! Credentials: signed, transaction-bound claim sets.
//!
//! A credential is a compact JWS (`header.payload.signature`, each segment
//! unpadded base64url). The payload names the issuer, subject, audience,
//! validity window and a `transaction_hash` claim carrying the binding
//! bytes that tie the credential to one authorization.
//!
//! This module only decodes and issues credentials; trust decisions live in
//! [`crate::verify`].

pub mod builder;
pub mod claims;
pub mod parser;

pub use builder::CredentialBuilder;
pub use claims::{Algorithm, ParsedClaimSet};
pub use parser::{parse, CredentialParser};

use serde::{Deserialize, Serialize};

/// A credential as presented to an account: the authenticator it targets
/// plus the opaque signed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentedCredential {
    pub authenticator_index: u32,
    pub payload: Vec<u8>,
}

impl PresentedCredential {
    pub fn new(authenticator_index: u32, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            authenticator_index,
            payload: payload.into(),
        }
    }
}
