// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service failure kinds.
//!
//! Tagged variants instead of exception-style control flow: every failure a
//! supervisor can observe is one of these, and user-visible output surfaces
//! the fixed short form from [`ServiceError::brief`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a managed service failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ServiceError {
    /// A profile references a service that is not defined.
    #[error("service '{name}' is not defined")]
    ServiceNotFound { name: String },

    /// The configured service directory does not exist.
    #[error("service directory does not exist: {dir}")]
    ServiceDirectoryNotExist { dir: String },

    /// fork/exec of the service command failed.
    #[error("failed to start command: {reason}")]
    FailedToStartCommand { reason: String },

    /// The child exited while it was expected to be running.
    #[error("process exited{}", exit_suffix(.code))]
    ProcessExited { code: Option<i32> },

    /// The readiness probe did not resolve before its deadline.
    #[error("readiness check timed out after {timeout_secs}s")]
    ReadinessTimeout { timeout_secs: u64 },

    /// Inferred from child output; treated like a failed start.
    #[error("port already in use")]
    PortAlreadyInUse,

    /// The retry policy is exhausted.
    #[error("max retries exceeded")]
    MaxRetriesExceeded,
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with code {code}"),
        None => String::new(),
    }
}

impl ServiceError {
    /// Fixed short string for user-facing status lines.
    pub fn brief(&self) -> &'static str {
        match self {
            ServiceError::ServiceNotFound { .. } => "not found",
            ServiceError::ServiceDirectoryNotExist { .. } => "missing directory",
            ServiceError::FailedToStartCommand { .. } => "failed to start",
            ServiceError::ProcessExited { .. } => "exited",
            ServiceError::ReadinessTimeout { .. } => "readiness timeout",
            ServiceError::PortAlreadyInUse => "port in use",
            ServiceError::MaxRetriesExceeded => "max retries",
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
