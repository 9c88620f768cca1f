// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fuku stop` scenarios.

use super::prelude::*;

#[test]
fn stop_without_session_reports_and_exits_zero() {
    let sandbox = Sandbox::new();
    let output = sandbox.fuku().arg("stop").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No active session found"), "{stdout}");
}

#[test]
fn stop_is_idempotent() {
    let sandbox = Sandbox::new();
    for _ in 0..2 {
        let output = sandbox.fuku().arg("stop").output().unwrap();
        assert!(output.status.success());
    }
}

#[test]
fn stop_signals_pids_from_a_leftover_session() {
    let sandbox = Sandbox::new();

    // A session file left behind by a crashed orchestrator.
    let mut orphan = std::process::Command::new("sleep")
        .arg("300")
        .spawn()
        .unwrap();
    let record = serde_json::json!({
        "profile": "default",
        "started_at": "2026-01-15T09:30:00Z",
        "services": {
            "db": {"pid": orphan.id(), "started_at": "2026-01-15T09:30:01Z"}
        }
    });
    std::fs::write(
        sandbox.session_path(),
        serde_json::to_vec_pretty(&record).unwrap(),
    )
    .unwrap();

    let output = sandbox.fuku().arg("stop").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Stopping profile 'default'"), "{stdout}");
    assert!(stdout.contains("db"), "{stdout}");
    assert!(stdout.contains("signalled"), "{stdout}");

    // The recorded process received SIGTERM.
    let status = orphan.wait().unwrap();
    assert!(!status.success());

    // The session file is left for the next `run` to clean up.
    assert!(sandbox.session_path().exists());
}

#[test]
fn stop_with_only_dead_pids_reports_nothing_to_signal() {
    let sandbox = Sandbox::new();

    let mut gone = std::process::Command::new("true").spawn().unwrap();
    let pid = gone.id();
    gone.wait().unwrap();

    let record = serde_json::json!({
        "profile": "default",
        "started_at": "2026-01-15T09:30:00Z",
        "services": {
            "db": {"pid": pid, "started_at": "2026-01-15T09:30:01Z"}
        }
    });
    std::fs::write(
        sandbox.session_path(),
        serde_json::to_vec_pretty(&record).unwrap(),
    )
    .unwrap();

    let output = sandbox.fuku().arg("stop").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No running processes to signal"), "{stdout}");
}
