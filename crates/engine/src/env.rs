// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine.

use crate::error::EngineError;
use std::path::PathBuf;

/// Resolve the state directory:
/// `FUKU_STATE_DIR` > `$XDG_STATE_HOME/fuku` > `~/.local/state/fuku`.
///
/// Holds the session file for the active run.
pub fn state_dir() -> Result<PathBuf, EngineError> {
    if let Ok(dir) = std::env::var("FUKU_STATE_DIR") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg).join("fuku"));
        }
    }
    let home = dirs::home_dir().ok_or(EngineError::NoStateDir)?;
    Ok(home.join(".local/state/fuku"))
}

/// Resolve the log scratch file path: `FUKU_LOG_PATH` > `<tmp>/fuku.log`.
///
/// A best-effort scratch file, truncated on every run.
pub fn log_path() -> PathBuf {
    if let Ok(path) = std::env::var("FUKU_LOG_PATH") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    std::env::temp_dir().join("fuku.log")
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
