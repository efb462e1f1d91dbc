//! Integration tests for the CLI binary.
//!
//! Verifies that the `idstore` binary responds to basic flags and drives a
//! file-backed store end to end.
//!
//! This test is registered as a [[test]] in the identity-store-cli crate
//! so that CARGO_BIN_EXE_idstore is available.

use std::path::Path;
use std::process::{Command, Output};

/// Get a Command pointing to the `idstore` binary.
fn idstore_binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_idstore"))
}

/// Run `idstore --dir DIR ARGS...`.
fn run_in(dir: &Path, args: &[&str]) -> Output {
    idstore_binary()
        .arg("--dir")
        .arg(dir)
        .args(args)
        .output()
        .expect("failed to execute idstore")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn cli_responds_to_help() {
    let output = idstore_binary()
        .arg("--help")
        .output()
        .expect("failed to execute idstore --help");

    assert!(
        output.status.success(),
        "idstore --help should exit with success, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = stdout(&output);
    assert!(
        stdout.contains("idstore") || stdout.contains("Usage"),
        "idstore --help output should contain usage information, got: {stdout}"
    );
}

#[test]
fn cli_responds_to_version() {
    let output = idstore_binary()
        .arg("--version")
        .output()
        .expect("failed to execute idstore --version");

    assert!(output.status.success());
    assert!(stdout(&output).contains("idstore"));
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let output = idstore_binary()
        .arg("--nonexistent-flag")
        .output()
        .expect("failed to execute idstore");

    assert!(
        !output.status.success(),
        "idstore with unknown flag should exit with error"
    );
}

#[test]
fn cli_email_and_site_round_trip() {
    let tmp = tempfile::tempdir().unwrap();

    let add = run_in(tmp.path(), &["email", "add", "a@x.com", "--pub", "k"]);
    assert!(add.status.success());

    let list = run_in(tmp.path(), &["email", "list"]);
    assert!(stdout(&list).contains("a@x.com"));

    let set = run_in(tmp.path(), &["site", "set", "example.com", "email", "a@x.com"]);
    assert!(set.status.success());

    let get = run_in(tmp.path(), &["site", "get", "example.com", "email"]);
    assert_eq!(stdout(&get).trim(), "\"a@x.com\"");

    let rejected = run_in(tmp.path(), &["site", "set", "example.com", "email", "b@x.com"]);
    assert!(!rejected.status.success());
    assert!(String::from_utf8_lossy(&rejected.stderr).contains("unknown email address"));

    let remove = run_in(tmp.path(), &["email", "remove", "a@x.com"]);
    assert!(remove.status.success());

    let get = run_in(tmp.path(), &["site", "get", "example.com", "email"]);
    assert_eq!(stdout(&get).trim(), "(none)");
}

#[test]
fn cli_trust_flow() {
    let tmp = tempfile::tempdir().unwrap();

    assert!(run_in(tmp.path(), &["map", "update", "7", "a@x.com"]).status.success());
    assert!(run_in(tmp.path(), &["trust", "confirm", "a@x.com"]).status.success());

    let status = stdout(&run_in(tmp.path(), &["trust", "status", "7"]));
    assert!(status.contains("confirmed"), "got: {status}");
    assert!(status.contains("Confirmed: true"), "got: {status}");

    let bad = run_in(tmp.path(), &["trust", "set", "7", "ask"]);
    assert!(!bad.status.success());

    let unknown = run_in(tmp.path(), &["trust", "seen", "nobody@x.com"]);
    assert!(!unknown.status.success());
}
