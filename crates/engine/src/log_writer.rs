// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log writer: `log_line` events → scratch file.
//!
//! A subscriber task filters incoming lines through an injected
//! [`LogFilter`] and feeds them into a bounded internal queue; a writer
//! task drains the queue to the scratch file, flushing after each line.
//! The queue smooths bursts; overflow drops (log lines are never
//! critical). The file is truncated on start and removed on stop.

use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use fuku_core::EventKind;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::bus::EventBus;

/// Depth of the queue between subscription and file I/O.
const LOG_QUEUE_DEPTH: usize = 10_000;

/// Decides, per event, whether a service's lines reach the file.
///
/// Evaluated on every line so filter state may change at runtime.
pub trait LogFilter: Send + Sync {
    fn is_enabled(&self, service: &str) -> bool;
}

/// Filter that passes every service.
pub struct AllowAll;

impl LogFilter for AllowAll {
    fn is_enabled(&self, _service: &str) -> bool {
        true
    }
}

/// Runtime-switchable allowlist; `None` passes everything.
#[derive(Default)]
pub struct ServiceFilter {
    allowed: RwLock<Option<HashSet<String>>>,
}

impl ServiceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, services: Option<HashSet<String>>) {
        *self.allowed.write() = services;
    }
}

impl LogFilter for ServiceFilter {
    fn is_enabled(&self, service: &str) -> bool {
        match &*self.allowed.read() {
            None => true,
            Some(allowed) => allowed.contains(service),
        }
    }
}

/// The running log writer; [`LogWriter::shutdown`] joins both tasks and
/// removes the scratch file.
pub struct LogWriter {
    ingest: tokio::task::JoinHandle<()>,
    writer: tokio::task::JoinHandle<()>,
}

impl LogWriter {
    pub fn spawn(
        bus: &EventBus,
        path: PathBuf,
        filter: Arc<dyn LogFilter>,
        cancel: CancellationToken,
    ) -> Self {
        let mut events = bus.subscribe_with_buffer(LOG_QUEUE_DEPTH);
        let (line_tx, line_rx) = mpsc::channel::<String>(LOG_QUEUE_DEPTH);

        let ingest_cancel = cancel.clone();
        let ingest = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = ingest_cancel.cancelled() => break,
                    event = events.recv() => {
                        let Some(event) = event else { break };
                        if let EventKind::LogLine { service, message, .. } = event.kind {
                            if filter.is_enabled(&service) {
                                // Overflow drops; log lines are best-effort.
                                let _ = line_tx.try_send(format!("[{service}] {message}"));
                            }
                        }
                    }
                }
            }
        });

        let writer = tokio::spawn(write_loop(path, line_rx, cancel));

        Self { ingest, writer }
    }

    /// Stop both tasks and remove the scratch file.
    pub async fn shutdown(self) {
        let _ = self.ingest.await;
        let _ = self.writer.await;
    }
}

async fn write_loop(path: PathBuf, mut lines: mpsc::Receiver<String>, cancel: CancellationToken) {
    let mut file = match std::fs::File::create(&path) {
        Ok(file) => file,
        Err(error) => {
            warn!(path = %path.display(), %error, "cannot open log scratch file");
            // Drain until cancelled so the ingest side is never blocked.
            cancel.cancelled().await;
            return;
        }
    };

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.recv() => {
                let Some(line) = line else { break };
                if writeln!(file, "{line}").is_err() {
                    break;
                }
                let _ = file.flush();
                let _ = file.sync_data();
            }
        }
    }

    drop(file);
    if let Err(error) = std::fs::remove_file(&path) {
        if error.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), %error, "failed to remove log scratch file");
        }
    }
}

#[cfg(test)]
#[path = "log_writer_tests.rs"]
mod tests;
