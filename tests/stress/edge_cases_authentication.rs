//! Edge case tests: time-window boundaries, malformed credentials, untrusted
//! issuers, key-id handling, size limits and oversized inputs.

use std::sync::Arc;

use abstract_account::crypto::encoding::{b64url_decode, b64url_encode};
use abstract_account::crypto::keys::Ed25519KeyPair;
use abstract_account::{
    AccountAddress, AccountId, AnchorKey, AuthError, AuthOutcome, AuthenticationEngine,
    Authenticator, CodeFingerprint, CredentialBuilder, EngineConfig, KeySet,
    RegistrationRequest, StaticKeySource,
};

const NOW: u64 = 1_700_000_000;
const ISSUER: &str = "issuer.example/edge";

struct Env {
    engine: AuthenticationEngine,
    source: Arc<StaticKeySource>,
    key: Ed25519KeyPair,
    addr: AccountAddress,
}

fn env_with(config: EngineConfig) -> Env {
    let key = Ed25519KeyPair::generate();
    let source = Arc::new(StaticKeySource::new());
    source.publish(
        ISSUER,
        KeySet::new(vec![AnchorKey::new(*key.verifying_key())], 0),
    );
    let engine = AuthenticationEngine::new(source.clone(), config).unwrap();

    let request = RegistrationRequest::new(
        CodeFingerprint::of_code(b"account"),
        AccountId(vec![3; 20]),
        "beef",
        Authenticator::ExternalClaim {
            issuer: Some(ISSUER.into()),
            subject: "user".into(),
            audience: "project".into(),
        },
    );
    let proof = builder(request.predicted_address().as_bytes())
        .valid_around(NOW, 60, 60)
        .sign(&key)
        .unwrap();
    let addr = engine.register(&request.proof(proof), NOW).unwrap();
    Env {
        engine,
        source,
        key,
        addr,
    }
}

fn env() -> Env {
    env_with(EngineConfig::default())
}

fn builder(binding: &[u8]) -> CredentialBuilder {
    CredentialBuilder::new(ISSUER, "user")
        .audience("project")
        .transaction_binding(binding.to_vec())
}

fn auth(env: &Env, token: &str, binding: &[u8]) -> AuthOutcome {
    env.engine
        .authenticate(&env.addr, 0, token.as_bytes(), binding, NOW)
}

// === Time Window ===

#[test]
fn edge_expiry_equal_to_now_is_accepted() {
    let env = env();
    let token = builder(b"tx").valid_between(NOW - 10, NOW).sign(&env.key).unwrap();
    assert!(auth(&env, &token, b"tx").is_accepted());
}

#[test]
fn edge_expiry_one_second_ago_is_expired() {
    let env = env();
    let token = builder(b"tx")
        .valid_between(NOW - 10, NOW - 1)
        .sign(&env.key)
        .unwrap();
    assert_eq!(
        auth(&env, &token, b"tx"),
        AuthOutcome::Rejected(AuthError::CredentialExpired)
    );
}

#[test]
fn edge_not_before_one_second_ahead_is_not_yet_valid() {
    let env = env();
    let token = builder(b"tx")
        .valid_between(NOW + 1, NOW + 10)
        .sign(&env.key)
        .unwrap();
    assert_eq!(
        auth(&env, &token, b"tx"),
        AuthOutcome::Rejected(AuthError::CredentialNotYetValid)
    );
}

#[test]
fn edge_zero_length_window_at_now_is_accepted() {
    let env = env();
    let token = builder(b"tx").valid_between(NOW, NOW).sign(&env.key).unwrap();
    assert!(auth(&env, &token, b"tx").is_accepted());
}

// === Malformed Input ===

#[test]
fn edge_garbage_is_malformed() {
    let env = env();
    for raw in ["", "abc", "a.b", "a.b.c.d", "!!!.???.***"] {
        assert!(
            matches!(
                auth(&env, raw, b"tx"),
                AuthOutcome::Rejected(AuthError::MalformedCredential(_))
            ),
            "{raw:?} should be malformed"
        );
    }
}

#[test]
fn edge_non_utf8_is_malformed() {
    let env = env();
    let outcome = env
        .engine
        .authenticate(&env.addr, 0, &[0xff, 0xfe, b'.', b'.'], b"tx", NOW);
    assert!(matches!(
        outcome,
        AuthOutcome::Rejected(AuthError::MalformedCredential(_))
    ));
}

#[test]
fn edge_oversized_credential_rejected_unparsed() {
    let env = env_with(EngineConfig {
        max_credential_bytes: 1024,
        ..EngineConfig::default()
    });
    let big = builder(&vec![7u8; 1024])
        .valid_around(NOW, 60, 60)
        .sign(&env.key)
        .unwrap();
    assert!(big.len() > 1024);
    assert!(matches!(
        env.engine.authenticate(&env.addr, 0, big.as_bytes(), &[7u8; 1024], NOW),
        AuthOutcome::Rejected(AuthError::MalformedCredential(_))
    ));
}

#[test]
fn edge_truncated_signature_is_malformed() {
    let env = env();
    let token = builder(b"tx").valid_around(NOW, 60, 60).sign(&env.key).unwrap();
    let (head, sig) = token.rsplit_once('.').unwrap();
    let sig = b64url_decode(sig).unwrap();
    let short = format!("{head}.{}", b64url_encode(&sig[..32]));
    assert!(matches!(
        auth(&env, &short, b"tx"),
        AuthOutcome::Rejected(AuthError::MalformedCredential(_))
    ));
}

#[test]
fn edge_flipped_signature_bit_is_invalid() {
    let env = env();
    let token = builder(b"tx").valid_around(NOW, 60, 60).sign(&env.key).unwrap();
    let (head, sig) = token.rsplit_once('.').unwrap();
    let mut sig = b64url_decode(sig).unwrap();
    sig[0] ^= 1;
    let forged = format!("{head}.{}", b64url_encode(&sig));
    assert_eq!(
        auth(&env, &forged, b"tx"),
        AuthOutcome::Rejected(AuthError::InvalidSignature)
    );
}

// === Issuers and Keys ===

#[test]
fn edge_issuer_removed_from_source_is_unknown_after_invalidation() {
    let env = env();
    env.source.remove(ISSUER);
    env.engine.resolver().invalidate(ISSUER);
    let token = builder(b"tx").valid_around(NOW, 60, 60).sign(&env.key).unwrap();
    assert!(matches!(
        auth(&env, &token, b"tx"),
        AuthOutcome::Rejected(AuthError::UnknownIssuer(_))
    ));
}

#[test]
fn edge_credential_without_key_id_still_verifies() {
    let env = env();
    let token = builder(b"tx")
        .valid_around(NOW, 60, 60)
        .without_key_id()
        .sign(&env.key)
        .unwrap();
    assert!(auth(&env, &token, b"tx").is_accepted());
}

#[test]
fn edge_rejection_does_not_disturb_account() {
    let env = env();
    let before = env.engine.account(&env.addr).unwrap();
    let impostor = Ed25519KeyPair::generate();
    let token = builder(b"tx").valid_around(NOW, 60, 60).sign(&impostor).unwrap();
    assert_eq!(
        auth(&env, &token, b"tx"),
        AuthOutcome::Rejected(AuthError::InvalidSignature)
    );
    assert_eq!(env.engine.account(&env.addr).unwrap(), before);
}

// === Binding ===

#[test]
fn edge_binding_must_match_exactly() {
    let env = env();
    let token = builder(b"transaction-1")
        .valid_around(NOW, 60, 60)
        .sign(&env.key)
        .unwrap();
    for other in [&b"transaction-"[..], &b"transaction-10"[..], &b"TRANSACTION-1"[..]] {
        assert_eq!(
            auth(&env, &token, other),
            AuthOutcome::Rejected(AuthError::ReplayOrBindingMismatch)
        );
    }
    assert!(auth(&env, &token, b"transaction-1").is_accepted());
}
