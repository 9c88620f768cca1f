// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-line text encoding of runtime events.
//!
//! One event per line: `<event_type> {key: value, key: value}`. Scripts
//! and the end-to-end suite match on these lines, so the key order and
//! punctuation here are a stable contract.

use fuku_core::{Event, EventKind};

/// Render one event as a text record.
pub fn render(event: &Event) -> String {
    match &event.kind {
        EventKind::ProfileResolved { profile, .. } => {
            format!("profile_resolved {{profile: {profile}}}")
        }
        EventKind::PhaseChanged { phase } => {
            format!("phase_changed {{phase: {phase}}}")
        }
        EventKind::TierStarting { tier, index, total } => {
            format!("tier_starting {{tier: {tier}, {index}/{total}}}")
        }
        EventKind::TierReady { tier } => {
            format!("tier_ready {{name: {tier}}}")
        }
        EventKind::TierFailed {
            tier,
            failed,
            total,
        } => {
            format!(
                "tier_failed {{name: {tier}, failed: [{}], total: {total}}}",
                failed.join(", ")
            )
        }
        EventKind::ServiceStarting {
            service,
            tier,
            attempt,
            pid,
        } => {
            format!(
                "service_starting {{service: {service}, tier: {tier}, attempt: {attempt}, pid: {pid}}}"
            )
        }
        EventKind::ServiceReady {
            service,
            tier,
            duration_ms,
        } => {
            format!(
                "service_ready {{service: {service}, tier: {tier}, duration_ms: {duration_ms}}}"
            )
        }
        EventKind::ServiceFailed {
            service,
            tier,
            error,
        } => {
            format!("service_failed {{service: {service}, tier: {tier}, error: {error}}}")
        }
        EventKind::ServiceStopped { service, tier } => {
            format!("service_stopped {{service: {service}, tier: {tier}}}")
        }
        EventKind::ServiceRestarting { service } => {
            format!("service_restarting {{service: {service}}}")
        }
        EventKind::RetryScheduled {
            service,
            attempt,
            max,
        } => {
            format!("retry_scheduled {{service: {service}, attempt: {attempt}, max: {max}}}")
        }
        EventKind::Signal { signal } => {
            format!("signal {{signal: {signal}}}")
        }
        EventKind::LogLine {
            service,
            stream,
            message,
            ..
        } => {
            format!("log_line {{service: {service}, stream: {stream}}} {message}")
        }
        EventKind::WatchTriggered { service, path } => {
            format!("watch_triggered {{service: {service}, path: {path}}}")
        }
    }
}

#[cfg(test)]
#[path = "text_tests.rs"]
mod tests;
