//! Authentication engine: orchestrates registry lookup, credential
//! parsing, trust anchor resolution and claim verification.
//!
//! Each authentication attempt moves through
//! `Received → Parsed → Resolved → Verified → {Accepted, Rejected}` and
//! ends in exactly one terminal state. A rejected attempt is final; the
//! submitter retries with a new transaction and a new binding value.
//!
//! Accounts are isolated: an attempt copies the one authenticator record it
//! needs and releases the account table before any verification work, so
//! no attempt observes another account's state. The trust anchor cache is
//! the only state shared between attempts.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::account::{Account, RegistrationRequest};
use crate::address::AccountAddress;
use crate::anchor::{KeySource, TrustAnchorResolver};
use crate::authenticator::{Authenticator, AuthenticatorRecord, AuthenticatorRegistry};
use crate::config::EngineConfig;
use crate::credential::{CredentialParser, PresentedCredential};
use crate::crypto::{keys, signing};
use crate::error::{AuthError, Result};
use crate::verify::{verify_claims, ExpectedClaims};

/// Terminal result of one authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Accepted { index: u32 },
    Rejected(AuthError),
}

impl AuthOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// The rejection reason, if rejected.
    pub fn reason(&self) -> Option<&AuthError> {
        match self {
            Self::Accepted { .. } => None,
            Self::Rejected(e) => Some(e),
        }
    }
}

/// Progress of an attempt, for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptState {
    Received,
    Parsed,
    Resolved,
    Verified,
}

/// The authenticator verification engine.
pub struct AuthenticationEngine {
    config: EngineConfig,
    parser: CredentialParser,
    resolver: Arc<TrustAnchorResolver>,
    accounts: RwLock<HashMap<AccountAddress, Account>>,
}

impl AuthenticationEngine {
    /// Create an engine with its own anchor cache over `source`.
    pub fn new(source: Arc<dyn KeySource>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let resolver = Arc::new(TrustAnchorResolver::new(source, &config));
        Ok(Self::with_resolver(resolver, config))
    }

    /// Create an engine over an existing (possibly shared) anchor cache.
    pub fn with_resolver(resolver: Arc<TrustAnchorResolver>, config: EngineConfig) -> Self {
        Self {
            parser: CredentialParser::new(config.max_credential_bytes),
            config,
            resolver,
            accounts: RwLock::new(HashMap::new()),
        }
    }

    pub fn resolver(&self) -> &Arc<TrustAnchorResolver> {
        &self.resolver
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Authenticate a transaction against one of an account's authenticators.
    ///
    /// `tx_binding` is computed by the caller from the transaction being
    /// authorized; the credential must carry exactly this value.
    pub fn authenticate(
        &self,
        address: &AccountAddress,
        authenticator_index: u32,
        raw_credential: &[u8],
        tx_binding: &[u8],
        now: u64,
    ) -> AuthOutcome {
        let record = match self.lookup(address, authenticator_index) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("account {address}: authenticator {authenticator_index} rejected: {e}");
                return AuthOutcome::Rejected(e);
            }
        };

        match self.check_credential(&record.authenticator, raw_credential, tx_binding, now) {
            Ok(()) => {
                log::debug!("account {address}: authenticator {authenticator_index} accepted");
                AuthOutcome::Accepted {
                    index: authenticator_index,
                }
            }
            Err(e) => {
                log::warn!(
                    "account {address}: authenticator {authenticator_index} ({}) rejected: {}",
                    record.authenticator.kind(),
                    e.kind()
                );
                AuthOutcome::Rejected(e)
            }
        }
    }

    /// Authenticate a credential that names its own authenticator index.
    pub fn authenticate_presented(
        &self,
        address: &AccountAddress,
        credential: &PresentedCredential,
        tx_binding: &[u8],
        now: u64,
    ) -> AuthOutcome {
        self.authenticate(
            address,
            credential.authenticator_index,
            &credential.payload,
            tx_binding,
            now,
        )
    }

    /// Create an account.
    ///
    /// The proof must be a credential for the initial authenticator bound to
    /// the predicted address. Nothing is stored unless every step succeeds.
    pub fn register(&self, request: &RegistrationRequest, now: u64) -> Result<AccountAddress> {
        if request.salt.is_empty() || request.salt.len() > self.config.max_salt_bytes {
            return Err(AuthError::InvalidRequest(format!(
                "salt must be 1..={} bytes, got {}",
                self.config.max_salt_bytes,
                request.salt.len()
            )));
        }

        let mut authenticators = AuthenticatorRegistry::new();
        authenticators.add_with_index(request.initial_index, request.authenticator.clone())?;

        let address = request.predicted_address();
        if self.read_accounts()?.contains_key(&address) {
            return Err(AuthError::AddressCollision(address.to_string()));
        }

        self.check_credential(
            &request.authenticator,
            &request.proof,
            address.as_bytes(),
            now,
        )?;

        let mut accounts = self.write_accounts()?;
        if accounts.contains_key(&address) {
            return Err(AuthError::AddressCollision(address.to_string()));
        }
        accounts.insert(
            address,
            Account {
                address,
                code_fingerprint: request.code_fingerprint,
                creator: request.creator.clone(),
                created_at: now,
                authenticators,
            },
        );
        log::info!(
            "registered account {address} with {} authenticator at index {}",
            request.authenticator.kind(),
            request.initial_index
        );
        Ok(address)
    }

    /// Attach another authenticator to an account.
    ///
    /// The surrounding transaction must already have been authorized through
    /// [`authenticate`](Self::authenticate); `proof` additionally shows
    /// control of the new authenticator, bound to the account address.
    pub fn add_authenticator(
        &self,
        address: &AccountAddress,
        authenticator: Authenticator,
        proof: &[u8],
        now: u64,
    ) -> Result<u32> {
        authenticator.validate()?;
        if !self.read_accounts()?.contains_key(address) {
            return Err(AuthError::NotFound(format!("account {address}")));
        }

        self.check_credential(&authenticator, proof, address.as_bytes(), now)?;

        let kind = authenticator.kind();
        let mut accounts = self.write_accounts()?;
        let account = accounts
            .get_mut(address)
            .ok_or_else(|| AuthError::NotFound(format!("account {address}")))?;
        let index = account.authenticators.add(authenticator)?;
        log::info!("account {address}: added {kind} authenticator at index {index}");
        Ok(index)
    }

    /// Detach an authenticator. The last one on an account cannot be removed.
    pub fn remove_authenticator(
        &self,
        address: &AccountAddress,
        index: u32,
    ) -> Result<AuthenticatorRecord> {
        let mut accounts = self.write_accounts()?;
        let account = accounts
            .get_mut(address)
            .ok_or_else(|| AuthError::NotFound(format!("account {address}")))?;
        let removed = account.authenticators.remove(index)?;
        log::info!("account {address}: removed authenticator {index}");
        Ok(removed)
    }

    /// Snapshot of an account.
    pub fn account(&self, address: &AccountAddress) -> Result<Account> {
        self.read_accounts()?
            .get(address)
            .cloned()
            .ok_or_else(|| AuthError::NotFound(format!("account {address}")))
    }

    fn lookup(&self, address: &AccountAddress, index: u32) -> Result<AuthenticatorRecord> {
        self.read_accounts()?
            .get(address)
            .ok_or_else(|| AuthError::NotFound(format!("account {address}")))?
            .authenticators
            .get(index)
    }

    /// Run one credential through the checks for its authenticator kind.
    fn check_credential(
        &self,
        authenticator: &Authenticator,
        raw: &[u8],
        tx_binding: &[u8],
        now: u64,
    ) -> Result<()> {
        trace(AttemptState::Received, authenticator);
        match authenticator {
            Authenticator::NativeSignature { public_key } => {
                if raw.len() != 64 {
                    return Err(AuthError::MalformedCredential(format!(
                        "native signature must be 64 bytes, got {}",
                        raw.len()
                    )));
                }
                let key = keys::verifying_key_from_base64(public_key)
                    .map_err(|_| AuthError::InvalidSignature)?;
                trace(AttemptState::Resolved, authenticator);
                signing::verify(&key, tx_binding, raw)?;
                trace(AttemptState::Verified, authenticator);
                Ok(())
            }
            Authenticator::ExternalClaim {
                issuer,
                subject,
                audience,
            } => {
                let claims = self.parser.parse(raw)?;
                trace(AttemptState::Parsed, authenticator);

                // An issuer this authenticator does not name is untrusted
                // here, however widely it is trusted elsewhere.
                let trusted = self.trusted_issuer(issuer.as_deref(), audience)?;
                if claims.issuer != trusted {
                    return Err(AuthError::UnknownIssuer(claims.issuer));
                }
                let anchor = self.resolver.resolve_at(&claims.issuer, now)?;
                trace(AttemptState::Resolved, authenticator);

                let expected = ExpectedClaims {
                    subject,
                    audience,
                    transaction_binding: tx_binding,
                };
                verify_claims(&claims, &anchor, &expected, now)?;
                trace(AttemptState::Verified, authenticator);
                Ok(())
            }
        }
    }

    /// The authenticator's own `iss`, or else the issuer configured for its
    /// audience.
    fn trusted_issuer<'a>(&'a self, named: Option<&'a str>, audience: &str) -> Result<&'a str> {
        named
            .or_else(|| self.config.issuer_for_audience(audience))
            .ok_or_else(|| {
                AuthError::UnknownIssuer(format!("no issuer configured for audience '{audience}'"))
            })
    }

    fn read_accounts(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<AccountAddress, Account>>> {
        self.accounts
            .read()
            .map_err(|_| AuthError::Config("account table lock poisoned".into()))
    }

    fn write_accounts(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<AccountAddress, Account>>> {
        self.accounts
            .write()
            .map_err(|_| AuthError::Config("account table lock poisoned".into()))
    }
}

fn trace(state: AttemptState, authenticator: &Authenticator) {
    log::debug!("{} attempt: {state:?}", authenticator.kind());
}
