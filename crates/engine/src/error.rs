// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine plumbing errors.
//!
//! These cover orchestration infrastructure only; per-service failures are
//! `fuku_core::ServiceError` values carried in events, never propagated as
//! hard errors to peers.

use crate::session::SessionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),

    #[error("file watcher for '{service}': {source}")]
    Watch {
        service: String,
        #[source]
        source: notify::Error,
    },

    #[error("invalid watch pattern '{pattern}' for '{service}': {source}")]
    WatchPattern {
        service: String,
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}
