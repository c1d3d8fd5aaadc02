//! Basic end-to-end checks for the `td` binary.
//!
//! Everything here runs without network access: configuration and
//! parameter errors are reported before any API call is attempted.

use std::process::Command;

use tempfile::TempDir;

fn td_binary() -> String {
    env!("CARGO_BIN_EXE_td").to_string()
}

/// Run the binary with a scrubbed environment so no real config leaks in.
fn run_td(home: &TempDir, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(td_binary())
        .env_clear()
        .env("HOME", home.path())
        .args(args)
        .output()
        .expect("failed to execute td");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);
    (stdout, stderr, code)
}

fn write_params(home: &TempDir, content: &str) -> String {
    let path = home.path().join("params.toml");
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

const VALID_PARAMS: &str = r#"
member = "tchristensen"
start_date = "2017-07-12"
timezone = "America/Los_Angeles"
daily_cap = 9.0

[[tickets]]
id = "339429"
"#;

#[test]
fn no_subcommand_prints_help() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_td(&home, &[]);
    assert_eq!(code, 0);
    assert!(stdout.contains("dispatch"));
    assert!(stdout.contains("calendar"));
    assert!(stdout.contains("tickets"));
}

#[test]
fn missing_params_file_fails_fast() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_td(&home, &["dispatch", "--params", "/does/not/exist.toml"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("not found"), "stderr: {stderr}");
}

#[test]
fn unknown_duplicate_policy_fails_before_any_dispatch() {
    let home = TempDir::new().unwrap();
    let params = write_params(
        &home,
        r#"
member = "tchristensen"
start_date = "2017-07-12"
timezone = "America/Los_Angeles"
duplicates = "replace"

[[tickets]]
id = "339429"
"#,
    );

    let (_, stderr, code) = run_td(&home, &["dispatch", "--params", &params]);
    assert_ne!(code, 0);
    assert!(
        stderr.contains("failed to load dispatch parameters"),
        "stderr: {stderr}"
    );
}

#[test]
fn missing_credentials_are_reported_with_fields() {
    let home = TempDir::new().unwrap();
    let params = write_params(&home, VALID_PARAMS);

    let (_, stderr, code) = run_td(&home, &["dispatch", "--params", &params, "--dry-run"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("missing API credentials"), "stderr: {stderr}");
    assert!(stderr.contains("private_key"), "stderr: {stderr}");
}

#[test]
fn invalid_timezone_is_rejected_by_clap() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_td(
        &home,
        &[
            "calendar",
            "--member",
            "tchristensen",
            "--from",
            "2017-07-12",
            "--timezone",
            "Mars/Olympus",
        ],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("Mars/Olympus"), "stderr: {stderr}");
}
