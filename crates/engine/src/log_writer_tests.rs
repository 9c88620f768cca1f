// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fuku_core::StdStream;
use std::time::Duration;

fn line(service: &str, message: &str) -> EventKind {
    EventKind::LogLine {
        service: service.into(),
        tier: "default".into(),
        stream: StdStream::Stdout,
        message: message.into(),
    }
}

async fn wait_for_content(path: &std::path::Path, needle: &str) -> String {
    for _ in 0..100 {
        if let Ok(content) = std::fs::read_to_string(path) {
            if content.contains(needle) {
                return content;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("log file never contained {needle:?}");
}

#[tokio::test]
async fn writes_lines_in_arrival_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fuku.log");
    let bus = EventBus::new();
    let cancel = CancellationToken::new();
    let writer = LogWriter::spawn(&bus, path.clone(), Arc::new(AllowAll), cancel.clone());

    bus.publish(line("auth-api", "first")).await;
    bus.publish(line("auth-api", "second")).await;

    let content = wait_for_content(&path, "second").await;
    let first = content.find("[auth-api] first").unwrap();
    let second = content.find("[auth-api] second").unwrap();
    assert!(first < second);

    cancel.cancel();
    writer.shutdown().await;
}

#[tokio::test]
async fn filter_is_evaluated_per_event() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fuku.log");
    let bus = EventBus::new();
    let cancel = CancellationToken::new();
    let filter = Arc::new(ServiceFilter::new());
    filter.set(Some(["kept".to_string()].into_iter().collect()));
    let writer = LogWriter::spawn(&bus, path.clone(), filter.clone(), cancel.clone());

    bus.publish(line("dropped", "hidden")).await;
    bus.publish(line("kept", "visible")).await;

    let content = wait_for_content(&path, "visible").await;
    assert!(!content.contains("hidden"));

    // The filter can change while the writer runs.
    filter.set(None);
    bus.publish(line("dropped", "now visible")).await;
    wait_for_content(&path, "now visible").await;

    cancel.cancel();
    writer.shutdown().await;
}

#[tokio::test]
async fn truncates_on_start_and_removes_on_stop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fuku.log");
    std::fs::write(&path, "stale content\n").unwrap();

    let bus = EventBus::new();
    let cancel = CancellationToken::new();
    let writer = LogWriter::spawn(&bus, path.clone(), Arc::new(AllowAll), cancel.clone());

    bus.publish(line("svc", "fresh")).await;
    let content = wait_for_content(&path, "fresh").await;
    assert!(!content.contains("stale"));

    cancel.cancel();
    writer.shutdown().await;
    assert!(!path.exists());
}

#[tokio::test]
async fn ignores_non_log_events() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fuku.log");
    let bus = EventBus::new();
    let cancel = CancellationToken::new();
    let writer = LogWriter::spawn(&bus, path.clone(), Arc::new(AllowAll), cancel.clone());

    bus.publish(EventKind::TierReady {
        tier: "default".into(),
    })
    .await;
    bus.publish(line("svc", "only this")).await;

    let content = wait_for_content(&path, "only this").await;
    assert_eq!(content.lines().count(), 1);

    cancel.cancel();
    writer.shutdown().await;
}
