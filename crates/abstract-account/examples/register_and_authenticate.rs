//! Register an account behind an external identity issuer and authorize
//! one transaction with a credential bound to it.
//!
//! Run with: `cargo run --example register_and_authenticate`

use std::sync::Arc;

use abstract_account::crypto::keys::Ed25519KeyPair;
use abstract_account::time::now_secs;
use abstract_account::{
    AccountId, AnchorKey, AuthOutcome, AuthenticationEngine, Authenticator, CodeFingerprint,
    CredentialBuilder, EngineConfig, KeySet, RegistrationRequest, StaticKeySource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let issuer = "https://issuer.example/demo";
    let issuer_key = Ed25519KeyPair::generate();

    let source = Arc::new(StaticKeySource::new());
    source.publish(
        issuer,
        KeySet::new(vec![AnchorKey::new(*issuer_key.verifying_key())], 0),
    );
    let engine = AuthenticationEngine::new(source, EngineConfig::default())?;

    let request = RegistrationRequest::new(
        CodeFingerprint::of_code(b"demo-account-code"),
        AccountId(vec![0xaa; 20]),
        "beef",
        Authenticator::ExternalClaim {
            issuer: Some(issuer.into()),
            subject: "demo-user".into(),
            audience: "demo-project".into(),
        },
    );
    let predicted = request.predicted_address();
    println!("Predicted address: {predicted}");

    let now = now_secs();
    let issue = |binding: &[u8]| {
        CredentialBuilder::new(issuer, "demo-user")
            .audience("demo-project")
            .valid_around(now, 300, 300)
            .transaction_binding(binding.to_vec())
            .sign(&issuer_key)
    };

    let address = engine.register(&request.proof(issue(predicted.as_bytes())?), now)?;
    println!("Registered:        {address}");

    let tx = b"transfer 10 to alice";
    let credential = issue(tx)?;
    match engine.authenticate(&address, 0, credential.as_bytes(), tx, now) {
        AuthOutcome::Accepted { index } => println!("Accepted via authenticator {index}"),
        AuthOutcome::Rejected(e) => println!("Rejected: {e}"),
    }

    let replay = engine.authenticate(
        &address,
        0,
        credential.as_bytes(),
        b"transfer 99 to mallory",
        now,
    );
    println!("Replay attempt:    {replay:?}");
    Ok(())
}
