//! Error types for the authenticator engine.
//!
//! Every verification path reports exactly one typed error: the first
//! violated check. Key material is never included in error messages.

/// Authentication, registration and registry errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Malformed credential: {0}")]
    MalformedCredential(String),

    #[error("Unknown issuer: {0}")]
    UnknownIssuer(String),

    #[error("Signature verification failed")]
    InvalidSignature,

    #[error("Credential expired")]
    CredentialExpired,

    #[error("Credential not yet valid")]
    CredentialNotYetValid,

    #[error("Claim mismatch: {0}")]
    ClaimMismatch(String),

    #[error("Transaction binding mismatch")]
    ReplayOrBindingMismatch,

    #[error("Address already in use: {0}")]
    AddressCollision(String),

    #[error("Cannot remove the last authenticator of an account")]
    LastAuthenticatorRemoval,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Stable tag for logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedCredential(_) => "malformed_credential",
            Self::UnknownIssuer(_) => "unknown_issuer",
            Self::InvalidSignature => "invalid_signature",
            Self::CredentialExpired => "credential_expired",
            Self::CredentialNotYetValid => "credential_not_yet_valid",
            Self::ClaimMismatch(_) => "claim_mismatch",
            Self::ReplayOrBindingMismatch => "replay_or_binding_mismatch",
            Self::AddressCollision(_) => "address_collision",
            Self::LastAuthenticatorRemoval => "last_authenticator_removal",
            Self::NotFound(_) => "not_found",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Config(_) => "config",
        }
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, AuthError>;
