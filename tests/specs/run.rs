// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fuku run` scenarios: concurrent tier startup, graceful shutdown,
//! ordered tiers, tier failure, watch-triggered restarts.

use super::prelude::*;
use std::time::Duration;

const STARTUP: Duration = Duration::from_secs(60);
const SHUTDOWN: Duration = Duration::from_secs(60);

/// Warm up briefly so both supervisors publish `service_starting` before
/// the first readiness line is printed, then stay alive.
const SERVE: &str = "sleep 1\necho listening on port\nexec sleep 300\n";

#[test]
fn default_tier_starts_concurrently_then_sigterm_stops_cleanly() {
    let sandbox = Sandbox::new();
    sandbox.config(
        r#"
version: 1
services:
  auth-api:
    dir: ./auth-api
    command: sh run.sh
    readiness: {type: log, pattern: "listening"}
  user-api:
    dir: ./user-api
    command: sh run.sh
    readiness: {type: log, pattern: "listening"}
profiles:
  default: "*"
defaults:
  profiles: [default]
"#,
    );
    sandbox.service("auth-api", SERVE);
    sandbox.service("user-api", SERVE);

    let mut session = sandbox.spawn(&["run", "default", "--no-ui"]);
    session.wait_for("phase_changed {phase: running}", STARTUP);

    let resolved = session.index_of("profile_resolved {profile: default}");
    let tier_starting = session.index_of("tier_starting {tier: default, 1/1}");
    let auth_starting = session.index_of("service_starting {service: auth-api");
    let user_starting = session.index_of("service_starting {service: user-api");
    let auth_ready = session.index_of("service_ready {service: auth-api");
    let user_ready = session.index_of("service_ready {service: user-api");
    let tier_ready = session.index_of("tier_ready {name: default}");

    assert!(resolved < tier_starting);
    assert!(tier_starting < auth_starting && tier_starting < user_starting);
    // Both services were starting before either became ready.
    assert!(auth_starting < auth_ready && auth_starting < user_ready);
    assert!(user_starting < auth_ready && user_starting < user_ready);
    assert!(auth_ready < tier_ready && user_ready < tier_ready);

    // Graceful shutdown on SIGTERM.
    session.sigterm();
    session.wait_for("signal {signal: terminated}", SHUTDOWN);
    let status = session.wait_exit(SHUTDOWN);
    assert_eq!(status.code(), Some(0), "lines:\n{}", session.lines.join("\n"));

    assert_eq!(session.count_of("service_stopped {service: auth-api"), 1);
    assert_eq!(session.count_of("service_stopped {service: user-api"), 1);
    assert_eq!(session.count_of("phase_changed {phase: stopped}"), 1);
    assert!(session
        .lines
        .last()
        .unwrap()
        .contains("phase_changed {phase: stopped}"));

    // Scratch files are gone after a clean stop.
    assert!(!sandbox.log_path.exists());
    assert!(!sandbox.session_path().exists());
}

#[test]
fn tiers_start_strictly_in_order() {
    let sandbox = Sandbox::new();
    sandbox.config(
        r#"
version: 1
services:
  db:
    dir: ./db
    tier: foundation
    command: sh run.sh
    readiness: {type: log, pattern: "listening"}
  api:
    dir: ./api
    tier: platform
    command: sh run.sh
    readiness: {type: log, pattern: "listening"}
  gateway:
    dir: ./gateway
    tier: edge
    command: sh run.sh
    readiness: {type: log, pattern: "listening"}
profiles:
  default: "*"
defaults:
  profiles: [default]
"#,
    );
    for name in ["db", "api", "gateway"] {
        sandbox.service(name, "echo listening\nexec sleep 300\n");
    }

    let mut session = sandbox.spawn(&["run", "default", "--no-ui"]);
    session.wait_for("phase_changed {phase: running}", STARTUP);

    let order = [
        session.index_of("tier_starting {tier: foundation"),
        session.index_of("tier_ready {name: foundation}"),
        session.index_of("tier_starting {tier: platform"),
        session.index_of("tier_ready {name: platform}"),
        session.index_of("tier_starting {tier: edge"),
        session.index_of("tier_ready {name: edge}"),
    ];
    assert!(
        order.windows(2).all(|pair| pair[0] < pair[1]),
        "tier events out of order: {order:?}\n{}",
        session.lines.join("\n")
    );

    session.sigterm();
    let status = session.wait_exit(SHUTDOWN);
    assert_eq!(status.code(), Some(0));
}

#[test]
fn failing_tier_aborts_with_exit_code_1() {
    let sandbox = Sandbox::new();
    sandbox.config(
        r#"
version: 1
services:
  broken:
    dir: ./broken
    command: sh run.sh
    readiness: {type: log, pattern: "never printed"}
    retry: {max_attempts: 1}
profiles:
  default: "*"
defaults:
  profiles: [default]
"#,
    );
    sandbox.service("broken", "echo failing hard\nexit 1\n");

    let mut session = sandbox.spawn(&["run", "default", "--no-ui"]);
    let status = session.wait_exit(STARTUP);
    assert_eq!(status.code(), Some(1), "lines:\n{}", session.lines.join("\n"));

    assert!(session.count_of("service_failed {service: broken") >= 1);
    assert_eq!(session.count_of("tier_failed {name: default"), 1);
    assert!(session
        .lines
        .last()
        .unwrap()
        .contains("phase_changed {phase: stopped}"));
}

#[test]
fn watch_change_triggers_restart_back_to_ready() {
    let sandbox = Sandbox::new();
    sandbox.config(
        r#"
version: 1
services:
  worker:
    dir: ./worker
    command: sh run.sh
    readiness: {type: log, pattern: "listening"}
    watch: ["**/*.go"]
profiles:
  default: "*"
defaults:
  profiles: [default]
"#,
    );
    sandbox.service("worker", "echo listening\nexec sleep 300\n");
    sandbox.touch("worker/main.go", "package main\n");

    let mut session = sandbox.spawn(&["run", "default", "--no-ui"]);
    session.wait_for("phase_changed {phase: running}", STARTUP);

    sandbox.touch("worker/main.go", "package main // edited\n");

    session.wait_for("watch_triggered {service: worker", Duration::from_secs(30));
    session.wait_for("service_restarting {service: worker", Duration::from_secs(30));

    // Back to ready after the restart: a second service_ready appears.
    session.wait_for_count(
        "service_ready {service: worker",
        2,
        Duration::from_secs(30),
    );

    let triggered = session.index_of("watch_triggered {service: worker");
    let restarting = session.index_of("service_restarting {service: worker");
    assert!(triggered < restarting);

    session.sigterm();
    let status = session.wait_exit(SHUTDOWN);
    assert_eq!(status.code(), Some(0));
}

#[test]
fn run_without_profile_uses_default() {
    let sandbox = Sandbox::new();
    sandbox.config(
        r#"
version: 1
services:
  solo:
    dir: ./solo
    command: sh run.sh
    readiness: {type: log, pattern: "listening"}
profiles:
  dev: "*"
defaults:
  profiles: [dev]
"#,
    );
    sandbox.service("solo", "echo listening\nexec sleep 300\n");

    let mut session = sandbox.spawn(&["run", "--no-ui"]);
    session.wait_for("profile_resolved {profile: dev}", STARTUP);
    session.wait_for("phase_changed {phase: running}", STARTUP);

    session.sigterm();
    let status = session.wait_exit(SHUTDOWN);
    assert_eq!(status.code(), Some(0));
}
