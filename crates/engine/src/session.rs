// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk session registry.
//!
//! A single JSON file under the per-user state directory records the active
//! run: profile name, start time, and the PID of every managed child. The
//! orchestrator mutates it reactively; the `logs` and `stop` commands read
//! it; the next startup uses it to find and kill orphans left by a crash.
//!
//! All operations are serialized by an internal mutex and are idempotent.
//! Writes are write-temp-then-rename so readers never observe a torn file.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fuku_core::{SessionEntry, SessionRecord};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};

/// File name of the session record inside the state directory.
const SESSION_FILE: &str = "session.json";

/// Grace between SIGTERM and SIGKILL during orphan cleanup.
const ORPHAN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt session file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// True when `pid` names a live process we are allowed to signal.
pub fn process_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

pub struct SessionRegistry {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SessionRegistry {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(SESSION_FILE),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically write the full record.
    pub fn save(&self, record: &SessionRecord) -> Result<(), SessionError> {
        let _guard = self.lock.lock();
        self.write_locked(record)
    }

    /// Read the record; `None` when no session file exists.
    pub fn load(&self) -> Result<Option<SessionRecord>, SessionError> {
        let _guard = self.lock.lock();
        self.read_locked()
    }

    /// Record one child process. A missing session file means the run is
    /// already being torn down; the entry is dropped silently.
    pub fn add(&self, service: &str, entry: SessionEntry) -> Result<(), SessionError> {
        let _guard = self.lock.lock();
        let Some(mut record) = self.read_locked()? else {
            return Ok(());
        };
        record.services.insert(service.to_string(), entry);
        self.write_locked(&record)
    }

    /// Remove one child process entry; absent entries are not an error.
    pub fn remove(&self, service: &str) -> Result<(), SessionError> {
        let _guard = self.lock.lock();
        let Some(mut record) = self.read_locked()? else {
            return Ok(());
        };
        if record.services.remove(service).is_some() {
            self.write_locked(&record)?;
        }
        Ok(())
    }

    /// Delete the session file; absence is not an error.
    pub fn delete(&self) -> Result<(), SessionError> {
        let _guard = self.lock.lock();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Kill processes recorded by a previous run that are still alive.
    ///
    /// SIGTERM first, then SIGKILL for anything still alive after a short
    /// grace. Returns the number of processes that had to be killed.
    pub async fn kill_orphans(&self, record: &SessionRecord) -> usize {
        let own = std::process::id();
        let live: Vec<(String, u32)> = record
            .services
            .iter()
            .filter(|(_, entry)| entry.pid != own && process_alive(entry.pid))
            .map(|(name, entry)| (name.clone(), entry.pid))
            .collect();

        if live.is_empty() {
            return 0;
        }

        for (service, pid) in &live {
            info!(service = %service, pid = *pid, "killing orphaned process");
            let _ = kill(Pid::from_raw(*pid as i32), Signal::SIGTERM);
        }

        tokio::time::sleep(ORPHAN_GRACE).await;

        for (service, pid) in &live {
            if process_alive(*pid) {
                warn!(service = %service, pid = *pid, "orphan survived SIGTERM, sending SIGKILL");
                let _ = kill(Pid::from_raw(*pid as i32), Signal::SIGKILL);
            }
        }

        live.len()
    }

    fn read_locked(&self) -> Result<Option<SessionRecord>, SessionError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SessionError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let record = serde_json::from_slice(&bytes).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(record))
    }

    fn write_locked(&self, record: &SessionRecord) -> Result<(), SessionError> {
        let io_err = |source| SessionError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let bytes = serde_json::to_vec_pretty(record).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
