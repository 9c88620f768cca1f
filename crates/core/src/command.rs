// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control commands published on the command bus.
//!
//! Commands are advisory: any subscriber may observe them, but the
//! orchestrator is the sole authoritative executor.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    #[serde(rename = "stop_service")]
    StopService { service: String },

    #[serde(rename = "restart_service")]
    RestartService { service: String },

    #[serde(rename = "stop_all")]
    StopAll,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::StopService { .. } => "stop_service",
            Command::RestartService { .. } => "restart_service",
            Command::StopAll => "stop_all",
        }
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
