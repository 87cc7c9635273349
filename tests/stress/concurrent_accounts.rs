//! Concurrency test: many accounts registering and authenticating in
//! parallel against one engine.

use std::sync::Arc;
use std::thread;

use abstract_account::crypto::keys::Ed25519KeyPair;
use abstract_account::{
    AccountAddress, AccountId, AnchorKey, AuthError, AuthOutcome, AuthenticationEngine,
    Authenticator, CodeFingerprint, CredentialBuilder, EngineConfig, KeySet,
    RegistrationRequest, StaticKeySource,
};

const NOW: u64 = 1_700_000_000;
const ISSUER: &str = "issuer.example/concurrent";

fn token(key: &Ed25519KeyPair, sub: &str, binding: &[u8]) -> Vec<u8> {
    CredentialBuilder::new(ISSUER, sub)
        .audience("project")
        .valid_around(NOW, 300, 300)
        .transaction_binding(binding.to_vec())
        .sign(key)
        .unwrap()
        .into_bytes()
}

fn setup() -> (Arc<AuthenticationEngine>, Arc<Ed25519KeyPair>, Arc<StaticKeySource>) {
    let key = Ed25519KeyPair::generate();
    let source = Arc::new(StaticKeySource::new());
    source.publish(
        ISSUER,
        KeySet::new(vec![AnchorKey::new(*key.verifying_key())], 0),
    );
    let engine = AuthenticationEngine::new(source.clone(), EngineConfig::default()).unwrap();
    (Arc::new(engine), Arc::new(key), source)
}

fn register(engine: &AuthenticationEngine, key: &Ed25519KeyPair, user: u32) -> AccountAddress {
    let sub = format!("user-{user}");
    let request = RegistrationRequest::new(
        CodeFingerprint::of_code(b"account"),
        AccountId(user.to_be_bytes().to_vec()),
        "beef",
        Authenticator::ExternalClaim {
            issuer: Some(ISSUER.into()),
            subject: sub.clone(),
            audience: "project".into(),
        },
    );
    let proof = token(key, &sub, request.predicted_address().as_bytes());
    engine.register(&request.proof(proof), NOW).unwrap()
}

#[test]
fn stress_50_accounts_authenticate_in_parallel() {
    let (engine, key, source) = setup();
    engine.resolver().resolve_at(ISSUER, NOW).unwrap();

    let mut handles = Vec::new();
    for user in 0..50u32 {
        let engine = Arc::clone(&engine);
        let key = Arc::clone(&key);
        handles.push(thread::spawn(move || {
            let addr = register(&engine, &key, user);
            let sub = format!("user-{user}");
            for tx in 0..20u32 {
                let binding = format!("{user}:{tx}");
                let outcome = engine.authenticate(
                    &addr,
                    0,
                    &token(&key, &sub, binding.as_bytes()),
                    binding.as_bytes(),
                    NOW,
                );
                assert_eq!(outcome, AuthOutcome::Accepted { index: 0 });
            }
            addr
        }));
    }

    let addresses: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let mut unique = addresses.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 50);

    // The warmed anchor served every account.
    assert_eq!(source.fetch_count(), 1);
}

#[test]
fn stress_accounts_do_not_accept_each_others_credentials() {
    let (engine, key, _source) = setup();
    let a = register(&engine, &key, 1);
    let b = register(&engine, &key, 2);

    let mut handles = Vec::new();
    for i in 0..16u32 {
        let engine = Arc::clone(&engine);
        let key = Arc::clone(&key);
        handles.push(thread::spawn(move || {
            let binding = format!("tx-{i}");
            // user-1's credential presented to account b.
            let cred = token(&key, "user-1", binding.as_bytes());
            let outcome = engine.authenticate(&b, 0, &cred, binding.as_bytes(), NOW);
            assert!(matches!(
                outcome,
                AuthOutcome::Rejected(AuthError::ClaimMismatch(_))
            ));
            assert!(engine
                .authenticate(&a, 0, &cred, binding.as_bytes(), NOW)
                .is_accepted());
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
}

#[test]
fn stress_racing_registrations_create_one_account() {
    let (engine, key, _source) = setup();
    let request = RegistrationRequest::new(
        CodeFingerprint::of_code(b"account"),
        AccountId(vec![7; 20]),
        "beef",
        Authenticator::ExternalClaim {
            issuer: Some(ISSUER.into()),
            subject: "racer".into(),
            audience: "project".into(),
        },
    );
    let proof = token(&key, "racer", request.predicted_address().as_bytes());
    let request = Arc::new(request.proof(proof));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = Arc::clone(&engine);
        let request = Arc::clone(&request);
        handles.push(thread::spawn(move || engine.register(&request, NOW)));
    }
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, AuthError::AddressCollision(_))));
}
