// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process runner: spawns and signals one service child.
//!
//! The child gets its own process group so stop signals reach its whole
//! subtree. Stdout and stderr are pumped line-by-line into `log_line`
//! events (LF-delimited, CR stripped, oversized lines split). A watch
//! channel exposes the exit result; `stop` escalates SIGTERM → SIGKILL
//! after a grace period.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fuku_core::{Clock, EventKind, ServiceDef, ServiceError, StdStream};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::io::AsyncReadExt;
use tokio::sync::watch;
use tracing::debug;

use crate::bus::EventBus;

/// Upper bound for one published log line; longer lines are split.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Default SIGTERM → SIGKILL grace.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

/// Substrings in child output that identify a port conflict.
const PORT_CONFLICT_MARKERS: &[&str] = &["address already in use", "eaddrinuse"];

/// How a child exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerExit {
    /// Exit code; `None` when killed by a signal.
    pub code: Option<i32>,
}

/// Handle to a spawned child. Cloneable; all clones observe the same exit.
#[derive(Clone, Debug)]
pub struct RunnerHandle {
    pid: u32,
    started_at_ms: u64,
    exit_rx: watch::Receiver<Option<RunnerExit>>,
    port_conflict: Arc<AtomicBool>,
}

impl RunnerHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn started_at_ms(&self) -> u64 {
        self.started_at_ms
    }

    pub fn has_exited(&self) -> bool {
        self.exit_rx.borrow().is_some()
    }

    /// True when the child's output mentioned a port conflict.
    pub fn port_conflict(&self) -> bool {
        self.port_conflict.load(Ordering::Relaxed)
    }

    /// Wait for the child to exit.
    pub async fn wait(&mut self) -> RunnerExit {
        loop {
            if let Some(exit) = *self.exit_rx.borrow() {
                return exit;
            }
            if self.exit_rx.changed().await.is_err() {
                // Sender dropped without a value: treat as a signal death.
                return RunnerExit { code: None };
            }
        }
    }

    /// SIGTERM the process group; SIGKILL anything still alive after
    /// `grace`. Returns the exit result.
    pub async fn stop(&mut self, grace: Duration) -> RunnerExit {
        self.signal(Signal::SIGTERM);
        match tokio::time::timeout(grace, self.wait()).await {
            Ok(exit) => exit,
            Err(_) => {
                debug!(pid = self.pid, "grace elapsed, sending SIGKILL");
                self.signal(Signal::SIGKILL);
                self.wait().await
            }
        }
    }

    fn signal(&self, signal: Signal) {
        if self.has_exited() {
            return;
        }
        // The child is its own process group leader.
        let _ = killpg(Pid::from_raw(self.pid as i32), signal);
    }
}

/// Spawn the service command in its directory.
///
/// Returns synchronously with the PID and spawn time so the caller can
/// publish `service_starting` before any readiness resolution.
pub fn spawn(
    def: &ServiceDef,
    bus: &EventBus,
    clock: &Arc<dyn Clock>,
) -> Result<RunnerHandle, ServiceError> {
    if !def.dir.is_dir() {
        return Err(ServiceError::ServiceDirectoryNotExist {
            dir: def.dir.display().to_string(),
        });
    }

    let argv = def.argv();
    let mut command = tokio::process::Command::new(&argv[0]);
    command
        .args(&argv[1..])
        .current_dir(&def.dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0);

    let mut child = command
        .spawn()
        .map_err(|source| ServiceError::FailedToStartCommand {
            reason: source.to_string(),
        })?;

    let pid = child.id().unwrap_or(0);
    let started_at_ms = clock.epoch_ms();
    let port_conflict = Arc::new(AtomicBool::new(false));

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(pump(
            stdout,
            def.name.clone(),
            def.tier.clone(),
            StdStream::Stdout,
            bus.clone(),
            Arc::clone(&port_conflict),
        ));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(pump(
            stderr,
            def.name.clone(),
            def.tier.clone(),
            StdStream::Stderr,
            bus.clone(),
            Arc::clone(&port_conflict),
        ));
    }

    let (exit_tx, exit_rx) = watch::channel(None);
    tokio::spawn(async move {
        let status = child.wait().await;
        let exit = RunnerExit {
            code: status.ok().and_then(|status| status.code()),
        };
        let _ = exit_tx.send(Some(exit));
    });

    Ok(RunnerHandle {
        pid,
        started_at_ms,
        exit_rx,
        port_conflict,
    })
}

/// Read one child stream to EOF, publishing a `log_line` event per line.
async fn pump(
    reader: impl tokio::io::AsyncRead + Unpin,
    service: String,
    tier: String,
    stream: StdStream,
    bus: EventBus,
    port_conflict: Arc<AtomicBool>,
) {
    let mut reader = reader;
    let mut pending: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                pending.extend_from_slice(&chunk[..n]);
                for line in drain_lines(&mut pending, MAX_LINE_LEN) {
                    emit(&bus, &service, &tier, stream, line, &port_conflict).await;
                }
            }
        }
    }

    if !pending.is_empty() {
        let trailing = String::from_utf8_lossy(&pending).into_owned();
        emit(&bus, &service, &tier, stream, trailing, &port_conflict).await;
    }
}

async fn emit(
    bus: &EventBus,
    service: &str,
    tier: &str,
    stream: StdStream,
    message: String,
    port_conflict: &AtomicBool,
) {
    if PORT_CONFLICT_MARKERS
        .iter()
        .any(|marker| message.to_ascii_lowercase().contains(marker))
    {
        port_conflict.store(true, Ordering::Relaxed);
    }
    bus.publish(EventKind::LogLine {
        service: service.to_string(),
        tier: tier.to_string(),
        stream,
        message,
    })
    .await;
}

/// Extract complete lines from `pending`, leaving any partial tail.
///
/// Lines are LF-delimited with a trailing CR stripped; once the pending
/// buffer reaches `max` bytes without a newline, a `max`-sized chunk is
/// split off as its own line.
fn drain_lines(pending: &mut Vec<u8>, max: usize) -> Vec<String> {
    let mut lines = Vec::new();
    loop {
        if let Some(newline) = pending.iter().position(|byte| *byte == b'\n') {
            if newline <= max {
                let mut line: Vec<u8> = pending.drain(..=newline).collect();
                line.pop(); // the LF
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                lines.push(String::from_utf8_lossy(&line).into_owned());
                continue;
            }
        }
        if pending.len() >= max {
            let chunk: Vec<u8> = pending.drain(..max).collect();
            lines.push(String::from_utf8_lossy(&chunk).into_owned());
            continue;
        }
        break;
    }
    lines
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
