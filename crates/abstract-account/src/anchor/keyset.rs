//! Key sets and their published document form.
//!
//! Issuers publish verification keys as a JSON key-set document:
//!
//! ```json
//! { "keys": [ { "kty": "OKP", "crv": "Ed25519", "kid": "...", "x": "<base64url>" },
//!             { "kty": "RSA", "alg": "RS256", "kid": "...", "n": "<base64url>", "e": "AQAB" } ],
//!   "epoch": 3 }
//! ```
//!
//! Ed25519 (`OKP`/`Ed25519`) and RSA entries are usable; RSA entries whose
//! `alg` names anything other than `RS256` are skipped, as are other key
//! types and keys not meant for signatures. `epoch` is optional and
//! defaults to 0.

use rsa::traits::PublicKeyParts;
use serde::{Deserialize, Serialize};

use crate::crypto::encoding::{b64url_decode, b64url_encode};
use crate::crypto::keys::verifying_key_from_bytes;
use crate::crypto::rs256;
use crate::crypto::verification::{Algorithm, VerificationKey};
use crate::error::{AuthError, Result};

/// One verification key with its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorKey {
    pub key_id: String,
    pub key: VerificationKey,
}

impl AnchorKey {
    /// Wrap a key under its derived id.
    pub fn new(key: impl Into<VerificationKey>) -> Self {
        let key = key.into();
        Self {
            key_id: key.key_id(),
            key,
        }
    }

    /// Wrap a key under an id chosen by the issuer.
    pub fn with_id(key_id: impl Into<String>, key: impl Into<VerificationKey>) -> Self {
        Self {
            key_id: key_id.into(),
            key: key.into(),
        }
    }
}

/// Keys for one issuer at one rotation epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySet {
    pub keys: Vec<AnchorKey>,
    pub rotation_epoch: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct KeySetDocument {
    keys: Vec<KeyDocument>,
    #[serde(default)]
    epoch: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct KeyDocument {
    kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    crv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    e: Option<String>,
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    key_use: Option<String>,
}

impl KeyDocument {
    /// The key this entry describes, or `None` if it is not usable here.
    fn verification_key(&self) -> Result<Option<VerificationKey>> {
        if self.key_use.as_deref().is_some_and(|u| u != "sig") {
            return Ok(None);
        }
        match (self.kty.as_str(), self.crv.as_deref()) {
            ("OKP", Some("Ed25519")) => {
                let x = member(self.x.as_deref(), "Ed25519", "x")?;
                Ok(Some(verifying_key_from_bytes(&x)?.into()))
            }
            ("RSA", _) if self.alg.as_deref().map_or(true, |a| a == Algorithm::Rs256.as_str()) => {
                let n = member(self.n.as_deref(), "RSA", "n")?;
                let e = member(self.e.as_deref(), "RSA", "e")?;
                Ok(Some(rs256::public_key_from_components(&n, &e)?.into()))
            }
            _ => {
                log::debug!(
                    "skipping key {:?}: unsupported type {}/{:?}/{:?}",
                    self.kid,
                    self.kty,
                    self.crv,
                    self.alg
                );
                Ok(None)
            }
        }
    }

    fn from_anchor_key(k: &AnchorKey) -> Self {
        let mut doc = Self {
            kid: Some(k.key_id.clone()),
            alg: Some(k.key.algorithm().as_str().to_string()),
            key_use: Some("sig".into()),
            ..Self::default()
        };
        match &k.key {
            VerificationKey::Ed25519(key) => {
                doc.kty = "OKP".into();
                doc.crv = Some("Ed25519".into());
                doc.x = Some(b64url_encode(key.to_bytes()));
            }
            VerificationKey::Rsa(key) => {
                doc.kty = "RSA".into();
                doc.n = Some(b64url_encode(key.n().to_bytes_be()));
                doc.e = Some(b64url_encode(key.e().to_bytes_be()));
            }
        }
        doc
    }
}

fn member(value: Option<&str>, kty: &str, name: &str) -> Result<Vec<u8>> {
    let value = value
        .ok_or_else(|| AuthError::InvalidRequest(format!("{kty} key without '{name}' member")))?;
    b64url_decode(value)
        .map_err(|e| AuthError::InvalidRequest(format!("invalid key '{name}' member: {e}")))
}

impl KeySet {
    pub fn new(keys: Vec<AnchorKey>, rotation_epoch: u64) -> Self {
        Self {
            keys,
            rotation_epoch,
        }
    }

    /// Parse a published key-set document.
    pub fn from_jwks_json(json: &str) -> Result<Self> {
        let doc: KeySetDocument = serde_json::from_str(json)
            .map_err(|e| AuthError::InvalidRequest(format!("invalid key set document: {e}")))?;

        let mut keys = Vec::with_capacity(doc.keys.len());
        for entry in doc.keys {
            let Some(key) = entry.verification_key()? else {
                continue;
            };
            keys.push(match entry.kid {
                Some(kid) => AnchorKey::with_id(kid, key),
                None => AnchorKey::new(key),
            });
        }

        if keys.is_empty() {
            return Err(AuthError::InvalidRequest(
                "key set contains no usable Ed25519 or RS256 keys".into(),
            ));
        }
        Ok(Self::new(keys, doc.epoch))
    }

    /// Render as a key-set document.
    pub fn to_jwks_json(&self) -> String {
        let doc = KeySetDocument {
            keys: self.keys.iter().map(KeyDocument::from_anchor_key).collect(),
            epoch: self.rotation_epoch,
        };
        serde_json::to_string_pretty(&doc).unwrap_or_default()
    }
}
