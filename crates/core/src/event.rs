// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime events published on the event bus.
//!
//! Every event kind carries a typed payload and serializes with
//! `{"type": "event_name", ...fields}`. Consumers match on the variant; there
//! is no field-inspection dispatch anywhere.

use crate::state::Phase;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One event on the bus: a stamped [`EventKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Milliseconds since the Unix epoch at publish time.
    pub at_ms: u64,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    pub fn new(at_ms: u64, kind: EventKind) -> Self {
        Self { at_ms, kind }
    }

    /// Critical events must never be dropped by a subscriber.
    pub fn is_critical(&self) -> bool {
        self.kind.is_critical()
    }
}

/// Which stream of the child process a log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdStream {
    Stdout,
    Stderr,
}

impl fmt::Display for StdStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StdStream::Stdout => f.write_str("stdout"),
            StdStream::Stderr => f.write_str("stderr"),
        }
    }
}

/// Tier composition as carried by `profile_resolved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSummary {
    pub name: String,
    pub services: Vec<String>,
}

/// Everything that can happen during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    #[serde(rename = "profile_resolved")]
    ProfileResolved {
        profile: String,
        tiers: Vec<TierSummary>,
    },

    /// Always critical: subscribers must observe every phase transition.
    #[serde(rename = "phase_changed")]
    PhaseChanged { phase: Phase },

    #[serde(rename = "tier_starting")]
    TierStarting {
        tier: String,
        /// 1-based position of this tier in the profile.
        index: usize,
        total: usize,
    },

    #[serde(rename = "tier_ready")]
    TierReady { tier: String },

    #[serde(rename = "tier_failed")]
    TierFailed {
        tier: String,
        failed: Vec<String>,
        total: usize,
    },

    #[serde(rename = "service_starting")]
    ServiceStarting {
        service: String,
        tier: String,
        attempt: u32,
        pid: u32,
    },

    #[serde(rename = "service_ready")]
    ServiceReady {
        service: String,
        tier: String,
        /// Time from spawn to readiness.
        duration_ms: u64,
    },

    #[serde(rename = "service_failed")]
    ServiceFailed {
        service: String,
        tier: String,
        error: String,
    },

    #[serde(rename = "service_stopped")]
    ServiceStopped { service: String, tier: String },

    #[serde(rename = "service_restarting")]
    ServiceRestarting { service: String },

    #[serde(rename = "retry_scheduled")]
    RetryScheduled {
        service: String,
        attempt: u32,
        max: u32,
    },

    /// An OS signal reached the orchestrator.
    #[serde(rename = "signal")]
    Signal { signal: String },

    #[serde(rename = "log_line")]
    LogLine {
        service: String,
        tier: String,
        stream: StdStream,
        message: String,
    },

    #[serde(rename = "watch_triggered")]
    WatchTriggered { service: String, path: String },
}

impl EventKind {
    /// The wire name of this event kind.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::ProfileResolved { .. } => "profile_resolved",
            EventKind::PhaseChanged { .. } => "phase_changed",
            EventKind::TierStarting { .. } => "tier_starting",
            EventKind::TierReady { .. } => "tier_ready",
            EventKind::TierFailed { .. } => "tier_failed",
            EventKind::ServiceStarting { .. } => "service_starting",
            EventKind::ServiceReady { .. } => "service_ready",
            EventKind::ServiceFailed { .. } => "service_failed",
            EventKind::ServiceStopped { .. } => "service_stopped",
            EventKind::ServiceRestarting { .. } => "service_restarting",
            EventKind::RetryScheduled { .. } => "retry_scheduled",
            EventKind::Signal { .. } => "signal",
            EventKind::LogLine { .. } => "log_line",
            EventKind::WatchTriggered { .. } => "watch_triggered",
        }
    }

    /// Critical events block the publisher until every subscriber accepts
    /// them; a slow UI may drop log spam but must see `phase_changed` and
    /// `signal`.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            EventKind::PhaseChanged { .. } | EventKind::Signal { .. }
        )
    }

    /// The service this event concerns, when it concerns exactly one.
    pub fn service(&self) -> Option<&str> {
        match self {
            EventKind::ServiceStarting { service, .. }
            | EventKind::ServiceReady { service, .. }
            | EventKind::ServiceFailed { service, .. }
            | EventKind::ServiceStopped { service, .. }
            | EventKind::ServiceRestarting { service }
            | EventKind::RetryScheduled { service, .. }
            | EventKind::LogLine { service, .. }
            | EventKind::WatchTriggered { service, .. } => Some(service),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
