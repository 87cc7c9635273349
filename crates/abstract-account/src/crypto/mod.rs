//! Cryptographic primitives.
//!
//! This module provides:
//! - Ed25519 key pairs for credential issuers and native-signature authenticators
//! - RSA (RS256) keys for issuers that publish RSA key sets
//! - Signing and verification over raw messages
//! - [`VerificationKey`](verification::VerificationKey), the issuer key as held by a trust anchor
//! - Base64 / base64url codecs used by the credential wire format

pub mod encoding;
pub mod keys;
pub mod rs256;
pub mod signing;
pub mod verification;
