// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config loading and resolution errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Covers malformed YAML and unknown keys (both hard errors).
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("unsupported config version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("service '{service}': {reason}")]
    InvalidService { service: String, reason: String },

    #[error("profile '{profile}': {reason}")]
    InvalidProfile { profile: String, reason: String },

    #[error("profile '{profile}' references undefined service '{service}'")]
    UnknownService { profile: String, service: String },

    #[error("profile '{0}' is not defined")]
    UnknownProfile(String),

    #[error("profile '{0}' selects no services")]
    EmptyProfile(String),

    #[error("no profile given and no default profile configured")]
    NoDefaultProfile,
}
