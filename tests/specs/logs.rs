// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fuku logs` scenarios.

use super::prelude::*;
use std::time::Duration;

#[test]
fn logs_without_session_reports_and_exits_zero() {
    let sandbox = Sandbox::new();
    let output = sandbox.fuku().args(["logs", "default"]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No active session found"), "{stdout}");
}

#[test]
fn logs_banner_shows_profile_services_and_running_count() {
    let sandbox = Sandbox::new();
    sandbox.config(
        r#"
version: 1
services:
  auth-api:
    dir: ./auth-api
    command: sh run.sh
    readiness: {type: log, pattern: "listening"}
profiles:
  default: "*"
defaults:
  profiles: [default]
"#,
    );
    sandbox.service("auth-api", "echo listening on port\nexec sleep 300\n");

    let mut run = sandbox.spawn(&["run", "default", "--no-ui"]);
    run.wait_for("phase_changed {phase: running}", Duration::from_secs(60));

    let mut logs = sandbox.spawn(&["logs", "default"]);
    // The banner must appear within five seconds.
    logs.wait_for("profile: default", Duration::from_secs(5));
    logs.wait_for("services:", Duration::from_secs(5));
    logs.wait_for("1 running", Duration::from_secs(5));

    // Existing log content is replayed to the follower.
    logs.wait_for("[auth-api] listening", Duration::from_secs(10));

    run.sigterm();
    let status = run.wait_exit(Duration::from_secs(60));
    assert_eq!(status.code(), Some(0));
}
