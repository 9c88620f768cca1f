// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The on-disk session record for an active run.
//!
//! Written by the orchestrator, read by the `logs` and `stop` commands, and
//! used on the next startup to find and kill orphaned children after a
//! crash. Compatibility is required only across same-binary versions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One recorded child process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
}

/// The full session record: which profile is running and with which PIDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub profile: String,
    pub started_at: DateTime<Utc>,
    /// Service name → child process entry. Sorted for stable serialization.
    #[serde(default)]
    pub services: BTreeMap<String, SessionEntry>,
}

impl SessionRecord {
    pub fn new(profile: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            profile: profile.into(),
            started_at,
            services: BTreeMap::new(),
        }
    }

    pub fn pids(&self) -> impl Iterator<Item = u32> + '_ {
        self.services.values().map(|entry| entry.pid)
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
