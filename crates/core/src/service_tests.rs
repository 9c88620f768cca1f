// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn def(name: &str) -> ServiceDef {
    ServiceDef {
        name: name.to_string(),
        dir: PathBuf::from("/srv").join(name),
        tier: "default".to_string(),
        profiles: ProfileSelector::default(),
        readiness: Readiness::None,
        watch: None,
        retry: RetryPolicy::default(),
        command: None,
    }
}

#[test]
fn argv_defaults_to_make_run() {
    assert_eq!(def("auth-api").argv(), vec!["make", "run"]);
}

#[test]
fn argv_uses_override() {
    let mut service = def("auth-api");
    service.command = Some(vec!["./serve.sh".into(), "--dev".into()]);
    assert_eq!(service.argv(), vec!["./serve.sh", "--dev"]);
}

#[test]
fn argv_ignores_empty_override() {
    let mut service = def("auth-api");
    service.command = Some(vec![]);
    assert_eq!(service.argv(), vec!["make", "run"]);
}

#[test]
fn selector_all_includes_everything() {
    assert!(ProfileSelector::All.includes("default"));
    assert!(ProfileSelector::All.includes("anything"));
}

#[test]
fn selector_named_is_exact() {
    let sel = ProfileSelector::Named(["dev".to_string()].into_iter().collect());
    assert!(sel.includes("dev"));
    assert!(!sel.includes("prod"));
}

#[yare::parameterized(
    none = { Readiness::None, Duration::ZERO },
    log = {
        Readiness::Log { pattern: "up".into(), timeout: Duration::from_secs(10) },
        Duration::from_secs(10)
    },
    http = {
        Readiness::Http { url: "http://localhost:1/".into(), timeout: Duration::from_secs(5) },
        Duration::from_secs(5)
    },
)]
fn readiness_timeout(readiness: Readiness, expected: Duration) {
    assert_eq!(readiness.timeout(), expected);
}

#[test]
fn watch_spec_default_debounce() {
    let spec = WatchSpec::new(vec!["**/*.go".into()]);
    assert_eq!(spec.debounce, DEFAULT_WATCH_DEBOUNCE);
}

#[test]
fn retry_policy_defaults() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.base_delay, Duration::from_secs(1));
    assert_eq!(policy.max_delay, Duration::from_secs(30));
}
