//! CLI integration tests.
//!
//! These run the built binary against an empty home directory.

use std::path::Path;
use std::process::{Command, Output};

fn binary_path() -> &'static str {
    env!("CARGO_BIN_EXE_mcpscope")
}

/// Run with every user directory pointed into `home`.
fn run(home: &Path, args: &[&str]) -> Output {
    Command::new(binary_path())
        .args(args)
        .current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("XDG_DATA_HOME", home.join(".local/share"))
        .env_remove("MCPSCOPE_CONFIG_CONTENT")
        .env_remove("MCPSCOPE_CLIENT_SECRET")
        .env_remove("MCPSCOPE_GATEWAY_URL")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_help_command() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("explore remote MCP servers"));
    for command in ["login", "logout", "status", "refresh", "tools", "call", "shell", "serve"] {
        assert!(stdout.contains(command), "help is missing {command}");
    }
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["--version"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("mcpscope"));
}

#[test]
fn test_status_when_signed_out() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["status"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Not signed in"));
}

#[test]
fn test_logout_when_signed_out() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["logout"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Signed out"));
}

#[test]
fn test_refresh_without_provider_fails() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["refresh"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No OAuth provider configured"));
}

#[test]
fn test_tools_without_endpoint_fails() {
    let home = tempfile::tempdir().unwrap();
    let output = run(home.path(), &["tools"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No MCP endpoint"));
}

#[test]
fn test_project_config_is_read() {
    let home = tempfile::tempdir().unwrap();
    std::fs::write(
        home.path().join("mcpscope.jsonc"),
        r#"{
            // refresh needs an oauth block; with one present it fails later,
            // on the missing token set
            "oauth": {
                "authorizationEndpoint": "https://idp.example.com/authorize",
                "tokenEndpoint": "https://idp.example.com/token",
                "clientId": "client-123"
            }
        }"#,
    )
    .unwrap();

    let output = run(home.path(), &["refresh"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("No OAuth provider configured"));
    assert!(stderr.contains("Not authenticated"));
}

#[test]
fn test_invalid_config_is_reported() {
    let home = tempfile::tempdir().unwrap();
    std::fs::write(home.path().join("mcpscope.json"), "{ not json").unwrap();

    let output = run(home.path(), &["status"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load configuration"));
}
