//! Integration tests for the fail-fast validation contract.
//!
//! These drive the built binary with a scrubbed environment and an empty
//! working directory, so resolution fails before any `az` invocation is
//! attempted.

use std::process::{Command, Output};

fn run_in_empty_dir(args: &[&str]) -> (Output, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let output = Command::new(env!("CARGO_BIN_EXE_vlab"))
        .args(args)
        .env_clear()
        .current_dir(dir.path())
        .output()
        .expect("run vlab");
    (output, dir)
}

#[test]
fn deploy_without_configuration_lists_every_missing_key() {
    let (output, _dir) = run_in_empty_dir(&["deploy"]);
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("missing required parameters"),
        "stderr: {stderr}"
    );
    assert!(stderr.contains("SUBSCRIPTION_ID"), "stderr: {stderr}");
    assert!(stderr.contains("ADMIN_PASSWORD"), "stderr: {stderr}");
}

#[test]
fn destroy_without_a_subscription_fails_before_any_deletion() {
    let (output, _dir) = run_in_empty_dir(&["destroy"]);
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("SUBSCRIPTION_ID"), "stderr: {stderr}");
}

#[test]
fn help_exits_cleanly() {
    let (output, _dir) = run_in_empty_dir(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("deploy"), "stdout: {stdout}");
    assert!(stdout.contains("destroy"), "stdout: {stdout}");
}
