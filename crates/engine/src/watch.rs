// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-service file watcher.
//!
//! Recursively observes the service directory, filters changes through the
//! configured glob patterns, and coalesces bursts with a debounce window:
//! any matching change inside the window extends it; when the window closes
//! quietly, exactly one `watch_triggered` event and one `restart_service`
//! command go out. The watcher never restarts anything itself.

use std::path::{Path, PathBuf};

use fuku_core::{Command, EventKind, ServiceDef, WatchSpec};
use notify::{EventKind as FsEventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::bus::EventBus;
use crate::command_bus::CommandBus;
use crate::error::EngineError;

/// Buffer between the notify callback thread and the debounce task.
const CHANGE_BUFFER: usize = 256;

#[derive(Debug)]
pub struct ServiceWatcher {
    // Held for its Drop: dropping the notify watcher releases the OS
    // handles synchronously.
    watcher: notify::RecommendedWatcher,
    task: tokio::task::JoinHandle<()>,
}

impl ServiceWatcher {
    /// Start watching one service's directory.
    pub fn spawn(
        def: &ServiceDef,
        spec: &WatchSpec,
        bus: EventBus,
        commands: CommandBus,
        cancel: CancellationToken,
    ) -> Result<Self, EngineError> {
        let mut patterns = Vec::with_capacity(spec.globs.len());
        for glob in &spec.globs {
            let pattern =
                glob::Pattern::new(glob).map_err(|source| EngineError::WatchPattern {
                    service: def.name.clone(),
                    pattern: glob.clone(),
                    source,
                })?;
            patterns.push(pattern);
        }

        let (change_tx, change_rx) = mpsc::channel::<PathBuf>(CHANGE_BUFFER);
        let root = def.dir.clone();
        let callback_root = root.clone();

        let mut watcher = notify::recommended_watcher(
            move |result: Result<notify::Event, notify::Error>| {
                let Ok(event) = result else { return };
                if !matches!(
                    event.kind,
                    FsEventKind::Create(_) | FsEventKind::Modify(_) | FsEventKind::Remove(_)
                ) {
                    return;
                }
                for path in event.paths {
                    if matches_globs(&callback_root, &patterns, &path) {
                        // Full buffer means a burst is already pending;
                        // the debounce collapses it anyway.
                        let _ = change_tx.try_send(path);
                    }
                }
            },
        )
        .map_err(|source| EngineError::Watch {
            service: def.name.clone(),
            source,
        })?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|source| EngineError::Watch {
                service: def.name.clone(),
                source,
            })?;

        let task = tokio::spawn(debounce_loop(
            def.name.clone(),
            spec.debounce,
            change_rx,
            bus,
            commands,
            cancel,
        ));

        Ok(Self { watcher, task })
    }

    /// Stop the OS watcher synchronously and join the debounce task.
    pub async fn close(self) {
        drop(self.watcher);
        self.task.abort();
        let _ = self.task.await;
    }
}

/// True when `path` passes the service's glob patterns (relative to the
/// watched root); an empty pattern list matches every file.
fn matches_globs(root: &Path, patterns: &[glob::Pattern], path: &Path) -> bool {
    if patterns.is_empty() {
        return true;
    }
    let relative = path.strip_prefix(root).unwrap_or(path);
    patterns
        .iter()
        .any(|pattern| pattern.matches_path(relative))
}

async fn debounce_loop(
    service: String,
    debounce: std::time::Duration,
    mut changes: mpsc::Receiver<PathBuf>,
    bus: EventBus,
    commands: CommandBus,
    cancel: CancellationToken,
) {
    loop {
        // Wait for the first change of a burst.
        let mut last = tokio::select! {
            _ = cancel.cancelled() => return,
            change = changes.recv() => match change {
                Some(path) => path,
                None => return,
            },
        };

        // Extend the window while changes keep arriving.
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(debounce) => break,
                change = changes.recv() => match change {
                    Some(path) => last = path,
                    None => break,
                },
            }
        }

        debug!(service = %service, path = %last.display(), "watch triggered");
        bus.publish(EventKind::WatchTriggered {
            service: service.clone(),
            path: last.display().to_string(),
        })
        .await;
        commands.publish(Command::RestartService {
            service: service.clone(),
        });
    }
}

/// Spawn watchers for every service in `services` that declares a watch.
///
/// Pattern or OS errors are logged and skip that service; a broken watcher
/// never blocks startup.
pub(crate) fn spawn_all(
    services: impl Iterator<Item = ServiceDef>,
    bus: &EventBus,
    commands: &CommandBus,
    cancel: &CancellationToken,
) -> Vec<ServiceWatcher> {
    let mut watchers = Vec::new();
    for def in services {
        let Some(spec) = def.watch.clone() else {
            continue;
        };
        match ServiceWatcher::spawn(&def, &spec, bus.clone(), commands.clone(), cancel.clone()) {
            Ok(watcher) => watchers.push(watcher),
            Err(error) => warn!(service = %def.name, %error, "file watcher disabled"),
        }
    }
    watchers
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
