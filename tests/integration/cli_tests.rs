//! Integration tests for the CLI binary.
//!
//! Drives the `aa` binary through keygen, issue, inspect and verify.
//!
//! This test is registered as a [[test]] in the abstract-account-cli crate
//! so that CARGO_BIN_EXE_aa is available.

use std::path::Path;
use std::process::{Command, Output};

/// Get a Command pointing to the `aa` binary.
fn aa_binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_aa"))
}

fn run(args: &[&str]) -> Output {
    aa_binary()
        .args(args)
        .output()
        .expect("failed to execute aa")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn keygen(dir: &Path) {
    let out = dir.to_str().unwrap();
    let output = run(&["keygen", "--out", out]);
    assert!(
        output.status.success(),
        "keygen failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn issue(dir: &Path, binding: &str) -> String {
    let key = dir.join("issuer.key");
    let output = run(&[
        "issue",
        "--key",
        key.to_str().unwrap(),
        "--issuer",
        "cli-issuer",
        "--sub",
        "integration-test-user",
        "--aud",
        "integration-test-project",
        "--binding",
        binding,
        "--valid-for",
        "5m",
    ]);
    assert!(
        output.status.success(),
        "issue failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    stdout(&output)
}

fn verify(dir: &Path, token: &str, binding: &str) -> Output {
    let jwks = dir.join("jwks.json");
    run(&[
        "verify",
        token,
        "--jwks",
        jwks.to_str().unwrap(),
        "--issuer",
        "cli-issuer",
        "--sub",
        "integration-test-user",
        "--aud",
        "integration-test-project",
        "--binding",
        binding,
    ])
}

#[test]
fn cli_responds_to_help() {
    let output = run(&["--help"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(
        out.contains("Usage") && out.contains("predict"),
        "aa --help output should list commands, got: {out}"
    );
}

#[test]
fn cli_responds_to_version() {
    let output = run(&["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("0.1"));
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    assert!(!run(&["--nonexistent-flag"]).status.success());
}

#[test]
fn cli_predict_is_deterministic() {
    let code = "ab".repeat(32);
    let args = [
        "predict",
        "--code-hash",
        code.as_str(),
        "--creator",
        "0102030405",
        "--salt",
        "beef",
    ];
    let first = run(&args);
    let second = run(&args);
    assert!(first.status.success());
    let addr = stdout(&first);
    assert_eq!(addr.len(), 64);
    assert_eq!(addr, stdout(&second));

    let mut other = args;
    other[6] = "cafe";
    assert_ne!(addr, stdout(&run(&other)));
}

#[test]
fn cli_predict_rejects_bad_hex() {
    let output = run(&[
        "predict",
        "--code-hash",
        "not-hex",
        "--creator",
        "01",
        "--salt",
        "beef",
    ]);
    assert!(!output.status.success());
}

#[test]
fn cli_issue_inspect_verify() {
    let dir = tempfile::tempdir().unwrap();
    keygen(dir.path());
    assert!(dir.path().join("issuer.key").exists());
    assert!(dir.path().join("jwks.json").exists());

    let token = issue(dir.path(), "deadbeef");
    assert_eq!(token.split('.').count(), 3);

    let inspect = run(&["inspect", &token]);
    assert!(inspect.status.success());
    let shown = stdout(&inspect);
    assert!(shown.contains("integration-test-user"));
    assert!(shown.contains("deadbeef"));

    let accepted = verify(dir.path(), &token, "deadbeef");
    assert!(
        accepted.status.success(),
        "verify failed: {}",
        String::from_utf8_lossy(&accepted.stderr)
    );
    assert!(stdout(&accepted).contains("ACCEPTED"));

    let replayed = verify(dir.path(), &token, "cafebabe");
    assert!(!replayed.status.success());
    assert!(stdout(&replayed).contains("replay_or_binding_mismatch"));
}

#[test]
fn cli_verify_rejects_foreign_key_set() {
    let issuer_dir = tempfile::tempdir().unwrap();
    let other_dir = tempfile::tempdir().unwrap();
    keygen(issuer_dir.path());
    keygen(other_dir.path());

    let token = issue(issuer_dir.path(), "deadbeef");
    let output = verify(other_dir.path(), &token, "deadbeef");
    assert!(!output.status.success());
    assert!(stdout(&output).contains("invalid_signature"));
}

#[test]
fn cli_keygen_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    keygen(dir.path());
    let output = run(&["keygen", "--out", dir.path().to_str().unwrap()]);
    assert!(!output.status.success());
}

#[test]
fn cli_rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    std::fs::write(&config, r#"{"max_anchors": 0}"#).unwrap();
    let output = run(&[
        "--config",
        config.to_str().unwrap(),
        "inspect",
        "a.b.c",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("max_anchors"));
}
