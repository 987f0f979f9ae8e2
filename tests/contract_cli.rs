//! Contract tests for the CLI: JSON on stdout and outcome-specific exit codes.

use std::process::Command;

fn taskrune(root: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_taskrune"));
    cmd.env("TASKRUNE_ROOT", root)
        .env_remove("TASKRUNE_CONFIG")
        .env("RUST_LOG", "error");
    cmd
}

#[test]
fn test_cli_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = taskrune(dir.path()).arg("--help").output().expect("spawn taskrune");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"));
}

#[test]
fn test_run_success_prints_json() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "abc").unwrap();

    let output = taskrune(dir.path())
        .args(["run", "compute sha-256 hash of notes.txt"])
        .output()
        .expect("spawn taskrune");
    assert_eq!(output.status.code(), Some(0));
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["artifact"], "hash.txt");
    assert!(dir.path().join("hash.txt").exists());
}

#[test]
fn test_run_exit_codes() {
    let dir = tempfile::tempdir().unwrap();
    let cases = [
        ("dance the tango", 1),
        ("read first 1 lines of ../secret.txt", 3),
        ("read first 1 lines of missing.txt", 5),
    ];
    for (task, code) in cases {
        let output = taskrune(dir.path()).args(["run", task]).output().expect("spawn taskrune");
        assert_eq!(output.status.code(), Some(code), "{task}");
    }
}

#[test]
fn test_read_command() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();

    let output = taskrune(dir.path()).args(["read", "notes.txt"]).output().expect("spawn taskrune");
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "hello");

    let output = taskrune(dir.path()).args(["read", "../notes.txt"]).output().expect("spawn taskrune");
    assert_eq!(output.status.code(), Some(5));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_invalid_timeout_env_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = taskrune(dir.path())
        .env("TASKRUNE_EXEC_TIMEOUT_SECS", "soon")
        .args(["run", "dance the tango"])
        .output()
        .expect("spawn taskrune");
    assert_eq!(output.status.code(), Some(4));
}
