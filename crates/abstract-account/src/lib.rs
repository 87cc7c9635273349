//! Abstract account authentication.
//!
//! Accounts are contract-like entities whose addresses are predictable
//! before creation and whose transactions are authorized by pluggable
//! authenticators: native Ed25519 signatures, or signed claims (EdDSA or
//! RS256) from an external identity issuer bound to one specific
//! transaction.

pub mod account;
pub mod address;
pub mod anchor;
pub mod authenticator;
pub mod config;
pub mod credential;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod time;
pub mod verify;

// Re-export primary types
pub use account::{Account, RegistrationRequest};
pub use address::{AccountAddress, AccountId, CodeFingerprint};
pub use config::EngineConfig;
pub use engine::{AuthOutcome, AuthenticationEngine};
pub use error::{AuthError, Result};

// Re-export authenticator and credential types
pub use anchor::{AnchorKey, KeySet, KeySource, StaticKeySource, TrustAnchor, TrustAnchorResolver};
pub use authenticator::{Authenticator, AuthenticatorRecord, AuthenticatorRegistry};
pub use crypto::rs256::RsaKeyPair;
pub use crypto::verification::{Algorithm, VerificationKey};
pub use credential::{CredentialBuilder, CredentialParser, ParsedClaimSet, PresentedCredential};
pub use verify::{verify_claims, ExpectedClaims, VerifiedClaims};
