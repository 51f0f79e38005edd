use std::process::{Command, Output};

fn docfetch(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_docfetch"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn missing_crate_name_is_a_usage_error() {
    let output = docfetch(&[]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "{stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let output = docfetch(&["serde", "--no-such-flag"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--no-such-flag"));
}

#[test]
fn help_exits_cleanly_on_stdout() {
    let output = docfetch(&["--help"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "{stdout}");
    assert!(stdout.contains("--output"));
}

#[test]
fn invalid_version_fails_before_touching_disk() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("rust-docs");

    let output = docfetch(&[
        "demo-pkg",
        "1/../../victim",
        "--output",
        root.to_str().unwrap(),
        "--base-url",
        "http://127.0.0.1:9/crate",
        "--no-unzip",
        "--no-proxy",
    ]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid output name"));
    assert!(!root.exists());
}
