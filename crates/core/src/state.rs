// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle phases: per-service and orchestration-wide.
//!
//! Both state machines are first-class enums; transitions live with their
//! owners (the service supervisor and the orchestrator). This module only
//! defines the states and the data that travels with them.

use crate::error::ServiceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of one managed service, owned by its supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServicePhase {
    Stopped,
    Starting,
    Running,
    Stopping,
    Restarting,
    Failed,
}

impl ServicePhase {
    /// True when a child process is expected to be alive in this phase.
    pub fn has_child(&self) -> bool {
        matches!(
            self,
            ServicePhase::Starting
                | ServicePhase::Running
                | ServicePhase::Stopping
                | ServicePhase::Restarting
        )
    }
}

impl fmt::Display for ServicePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServicePhase::Stopped => "stopped",
            ServicePhase::Starting => "starting",
            ServicePhase::Running => "running",
            ServicePhase::Stopping => "stopping",
            ServicePhase::Restarting => "restarting",
            ServicePhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Runtime state of one managed service.
///
/// Mutated only by the owning supervisor; read-only copies flow through the
/// event bus.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceState {
    pub phase: ServicePhase,
    /// Start attempt counter; 0 until the first start.
    pub attempt: u32,
    /// PID of the child process, 0 when no child is running.
    pub pid: u32,
    /// Epoch ms of the most recent spawn, 0 before the first spawn.
    pub started_at_ms: u64,
    /// Epoch ms of the most recent readiness, 0 until ready.
    pub ready_at_ms: u64,
    pub last_error: Option<ServiceError>,
}

impl ServiceState {
    pub fn new() -> Self {
        Self {
            phase: ServicePhase::Stopped,
            attempt: 0,
            pid: 0,
            started_at_ms: 0,
            ready_at_ms: 0,
            last_error: None,
        }
    }
}

impl Default for ServiceState {
    fn default() -> Self {
        Self::new()
    }
}

/// Global orchestration phase.
///
/// Totally ordered; transitions are monotonic. The orchestrator is the sole
/// owner and publishes every transition as a `phase_changed` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Startup,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Startup => "startup",
            Phase::Running => "running",
            Phase::Stopping => "stopping",
            Phase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
