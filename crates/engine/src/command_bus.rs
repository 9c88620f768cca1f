// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out command bus.
//!
//! Same shape as the event bus with a single drop policy: every send is
//! non-blocking. Commands are advisory; the orchestrator is the sole
//! authoritative executor, so a dropped command is a missed request, not a
//! correctness problem.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use fuku_core::Command;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::trace;

/// Default per-subscriber buffer depth.
const COMMAND_BUFFER: usize = 64;

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<Command>,
}

struct BusInner {
    subscribers: RwLock<Vec<Subscriber>>,
    closed: AtomicBool,
    next_id: AtomicU64,
}

#[derive(Clone)]
pub struct CommandBus {
    inner: Arc<BusInner>,
}

impl CommandBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscribers: RwLock::new(Vec::new()),
                closed: AtomicBool::new(false),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn subscribe(&self) -> CommandStream {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut subscribers = self.inner.subscribers.write();
            if !self.inner.closed.load(Ordering::Acquire) {
                subscribers.push(Subscriber { id, tx });
            }
        }
        CommandStream {
            id,
            rx,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Deliver to every subscriber, dropping per subscriber on overflow.
    pub fn publish(&self, command: Command) {
        if self.inner.closed.load(Ordering::Acquire) {
            return;
        }
        let mut gone = Vec::new();
        {
            let subscribers = self.inner.subscribers.read();
            for subscriber in subscribers.iter() {
                match subscriber.tx.try_send(command.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(dropped)) => {
                        trace!(
                            command = dropped.name(),
                            subscriber = subscriber.id,
                            "command dropped"
                        );
                    }
                    Err(TrySendError::Closed(_)) => gone.push(subscriber.id),
                }
            }
        }
        if !gone.is_empty() {
            self.inner
                .subscribers
                .write()
                .retain(|subscriber| !gone.contains(&subscriber.id));
        }
    }

    /// Idempotent close; later publishes are no-ops.
    pub fn close(&self) {
        let mut subscribers = self.inner.subscribers.write();
        self.inner.closed.store(true, Ordering::Release);
        subscribers.clear();
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CommandStream {
    id: u64,
    rx: mpsc::Receiver<Command>,
    inner: Arc<BusInner>,
}

impl CommandStream {
    pub async fn recv(&mut self) -> Option<Command> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Command> {
        self.rx.try_recv().ok()
    }
}

impl Drop for CommandStream {
    fn drop(&mut self) {
        self.inner
            .subscribers
            .write()
            .retain(|subscriber| subscriber.id != self.id);
    }
}

#[cfg(test)]
#[path = "command_bus_tests.rs"]
mod tests;
