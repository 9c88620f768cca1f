// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config-surface specs: strict schema and resolution errors.

use super::prelude::*;

#[test]
fn missing_config_file_is_an_error() {
    let sandbox = Sandbox::new();
    let output = sandbox
        .fuku()
        .args(["run", "default", "--no-ui"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config file not found"), "{stderr}");
}

#[test]
fn unknown_keys_are_a_hard_error() {
    let sandbox = Sandbox::new();
    sandbox.config("version: 1\nsevrices: {}\n");
    let output = sandbox
        .fuku()
        .args(["run", "default", "--no-ui"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid config"), "{stderr}");
}

#[test]
fn unsupported_version_is_rejected() {
    let sandbox = Sandbox::new();
    sandbox.config("version: 9\n");
    let output = sandbox
        .fuku()
        .args(["run", "default", "--no-ui"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unsupported config version 9"), "{stderr}");
}

#[test]
fn unknown_profile_is_rejected() {
    let sandbox = Sandbox::new();
    sandbox.config(
        r#"
version: 1
services:
  a: {dir: ./a}
profiles:
  default: "*"
"#,
    );
    let output = sandbox
        .fuku()
        .args(["run", "ghost", "--no-ui"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("profile 'ghost' is not defined"), "{stderr}");
}

#[test]
fn profile_referencing_undefined_service_is_rejected() {
    let sandbox = Sandbox::new();
    sandbox.config(
        r#"
version: 1
services:
  a: {dir: ./a}
profiles:
  default: [a, ghost]
"#,
    );
    let output = sandbox
        .fuku()
        .args(["run", "default", "--no-ui"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("references undefined service 'ghost'"),
        "{stderr}"
    );
}

#[test]
fn run_without_profile_and_no_default_is_rejected() {
    let sandbox = Sandbox::new();
    sandbox.config(
        r#"
version: 1
services:
  a: {dir: ./a}
profiles:
  default: "*"
"#,
    );
    let output = sandbox.fuku().args(["run", "--no-ui"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no default profile"), "{stderr}");
}

#[test]
fn help_shows_all_modes() {
    let sandbox = Sandbox::new();
    let output = sandbox.fuku().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for mode in ["run", "logs", "stop"] {
        assert!(stdout.contains(mode), "{stdout}");
    }
}
