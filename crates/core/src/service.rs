// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable service definitions, produced by config loading.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Default readiness timeout when the config does not specify one.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(30);

/// Default debounce window for file watchers.
pub const DEFAULT_WATCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// One managed child process as described by config.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDef {
    /// Unique key across the whole config.
    pub name: String,
    /// Working directory for the service command.
    pub dir: PathBuf,
    /// Startup tier tag; every service belongs to exactly one tier.
    pub tier: String,
    /// Which profiles this service participates in.
    pub profiles: ProfileSelector,
    pub readiness: Readiness,
    pub watch: Option<WatchSpec>,
    pub retry: RetryPolicy,
    /// Override of the default `make run` invocation.
    pub command: Option<Vec<String>>,
}

impl ServiceDef {
    /// The argv the runner spawns: the configured override or `make run`.
    pub fn argv(&self) -> Vec<String> {
        match &self.command {
            Some(argv) if !argv.is_empty() => argv.clone(),
            _ => vec!["make".to_string(), "run".to_string()],
        }
    }
}

/// Which profiles a service belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSelector {
    /// Member of every profile.
    All,
    Named(BTreeSet<String>),
}

impl ProfileSelector {
    pub fn includes(&self, profile: &str) -> bool {
        match self {
            ProfileSelector::All => true,
            ProfileSelector::Named(names) => names.contains(profile),
        }
    }
}

impl Default for ProfileSelector {
    fn default() -> Self {
        ProfileSelector::All
    }
}

/// How a service reports readiness after starting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Ready as soon as the process has spawned.
    None,
    /// Ready on the first log line containing `pattern`.
    Log { pattern: String, timeout: Duration },
    /// Ready on the first HTTP status in [200, 400).
    Http { url: String, timeout: Duration },
}

impl Readiness {
    /// The overall probe deadline; zero for [`Readiness::None`].
    pub fn timeout(&self) -> Duration {
        match self {
            Readiness::None => Duration::ZERO,
            Readiness::Log { timeout, .. } | Readiness::Http { timeout, .. } => *timeout,
        }
    }
}

/// File-watch configuration for restart-on-change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSpec {
    /// Glob patterns relative to the service dir; empty means every file.
    pub globs: Vec<String>,
    /// Quiet window that coalesces change bursts into one restart.
    pub debounce: Duration,
}

impl WatchSpec {
    pub fn new(globs: Vec<String>) -> Self {
        Self {
            globs,
            debounce: DEFAULT_WATCH_DEBOUNCE,
        }
    }
}

/// Retry policy applied when a service fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total start attempts before the failure becomes terminal.
    pub max_attempts: u32,
    /// First backoff interval; doubles per attempt.
    pub base_delay: Duration,
    /// Backoff cap.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
