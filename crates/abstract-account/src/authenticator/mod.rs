//! Authenticators: the verification strategies attached to an account.
//!
//! Kinds form a closed enum: adding one (multisig, session keys, ...) means a
//! new variant here and a new arm in the engine's dispatch, which the
//! compiler then checks for exhaustiveness.

pub mod registry;

pub use registry::AuthenticatorRegistry;

use serde::{Deserialize, Serialize};

use crate::crypto::keys::verifying_key_from_base64;
use crate::error::{AuthError, Result};

/// Verification material for one authenticator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Authenticator {
    /// Ed25519 signature over the transaction binding.
    NativeSignature {
        /// Standard base64 public key.
        public_key: String,
    },
    /// Signed claim from a trusted external issuer (OIDC-style token).
    ///
    /// Without `iss`, the engine trusts the issuer configured for `aud`
    /// (`EngineConfig::audience_issuers`).
    #[serde(rename = "Jwt")]
    ExternalClaim {
        #[serde(rename = "iss", default, skip_serializing_if = "Option::is_none")]
        issuer: Option<String>,
        #[serde(rename = "sub")]
        subject: String,
        #[serde(rename = "aud")]
        audience: String,
    },
}

impl Authenticator {
    /// Stable tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NativeSignature { .. } => "native_signature",
            Self::ExternalClaim { .. } => "external_claim",
        }
    }

    /// Reject parameters that could never verify anything.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::NativeSignature { public_key } => {
                verifying_key_from_base64(public_key)?;
            }
            Self::ExternalClaim {
                issuer,
                subject,
                audience,
            } => {
                if issuer.as_deref() == Some("") {
                    return Err(AuthError::InvalidRequest(
                        "external claim authenticator has empty issuer".into(),
                    ));
                }
                for (name, value) in [("subject", subject), ("audience", audience)] {
                    if value.is_empty() {
                        return Err(AuthError::InvalidRequest(format!(
                            "external claim authenticator has empty {name}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// An authenticator together with its index on the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatorRecord {
    pub index: u32,
    pub authenticator: Authenticator,
}
