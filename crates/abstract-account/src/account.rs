//! Accounts and registration requests.

use serde::{Deserialize, Serialize};

use crate::address::{self, AccountAddress, AccountId, CodeFingerprint};
use crate::authenticator::{Authenticator, AuthenticatorRegistry};

/// An abstract account: an address plus the authenticators that control it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: AccountAddress,
    pub code_fingerprint: CodeFingerprint,
    pub creator: AccountId,
    /// Registration time (Unix seconds).
    pub created_at: u64,
    pub authenticators: AuthenticatorRegistry,
}

/// Everything needed to predict and then create an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub code_fingerprint: CodeFingerprint,
    pub creator: AccountId,
    pub salt: Vec<u8>,
    /// Instantiation arguments folded into the address (empty by default).
    pub init_args: Vec<u8>,
    /// Index given to the initial authenticator.
    pub initial_index: u32,
    pub authenticator: Authenticator,
    /// Credential proving control of `authenticator`, bound to the
    /// predicted address.
    pub proof: Vec<u8>,
}

impl RegistrationRequest {
    pub fn new(
        code_fingerprint: CodeFingerprint,
        creator: AccountId,
        salt: impl Into<Vec<u8>>,
        authenticator: Authenticator,
    ) -> Self {
        Self {
            code_fingerprint,
            creator,
            salt: salt.into(),
            init_args: Vec::new(),
            initial_index: 0,
            authenticator,
            proof: Vec::new(),
        }
    }

    pub fn init_args(mut self, init_args: impl Into<Vec<u8>>) -> Self {
        self.init_args = init_args.into();
        self
    }

    pub fn initial_index(mut self, index: u32) -> Self {
        self.initial_index = index;
        self
    }

    pub fn proof(mut self, proof: impl Into<Vec<u8>>) -> Self {
        self.proof = proof.into();
        self
    }

    /// The address this request will instantiate. Safe to call (and fund)
    /// before submitting.
    pub fn predicted_address(&self) -> AccountAddress {
        address::derive(
            &self.code_fingerprint,
            &self.creator,
            &self.salt,
            &self.init_args,
        )
    }
}
