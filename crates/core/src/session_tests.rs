// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

fn record() -> SessionRecord {
    let mut record = SessionRecord::new(
        "default",
        Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap(),
    );
    record.services.insert(
        "auth-api".into(),
        SessionEntry {
            pid: 4242,
            started_at: Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 1).unwrap(),
        },
    );
    record
}

#[test]
fn serde_round_trip() {
    let record = record();
    let json = serde_json::to_string_pretty(&record).unwrap();
    let parsed: SessionRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, record);
}

#[test]
fn missing_services_map_defaults_empty() {
    let json = r#"{"profile": "default", "started_at": "2026-01-15T09:30:00Z"}"#;
    let parsed: SessionRecord = serde_json::from_str(json).unwrap();
    assert!(parsed.services.is_empty());
}

#[test]
fn pids_lists_all_entries() {
    let mut record = record();
    record.services.insert(
        "user-api".into(),
        SessionEntry {
            pid: 4243,
            started_at: record.started_at,
        },
    );
    let mut pids: Vec<_> = record.pids().collect();
    pids.sort_unstable();
    assert_eq!(pids, vec![4242, 4243]);
}
