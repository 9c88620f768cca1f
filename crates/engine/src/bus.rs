// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out event bus.
//!
//! Each subscriber owns a bounded channel. Publishing a non-critical event
//! performs a non-blocking send per subscriber and drops the event for any
//! subscriber whose buffer is full; publishing a critical event awaits every
//! subscriber. A slow consumer can therefore skip log spam but can never
//! miss `phase_changed(Stopped)`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use fuku_core::{Clock, Event, EventKind, SystemClock};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::trace;

/// Default per-subscriber buffer depth.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<Event>,
}

struct BusInner {
    subscribers: RwLock<Vec<Subscriber>>,
    closed: AtomicBool,
    next_id: AtomicU64,
    clock: Arc<dyn Clock>,
}

/// Cloneable handle to the shared bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscribers: RwLock::new(Vec::new()),
                closed: AtomicBool::new(false),
                next_id: AtomicU64::new(0),
                clock,
            }),
        }
    }

    /// Create a subscription with the default buffer.
    pub fn subscribe(&self) -> EventStream {
        self.subscribe_with_buffer(DEFAULT_SUBSCRIBER_BUFFER)
    }

    /// Create a subscription with an explicit buffer depth.
    ///
    /// Dropping the returned stream ends the subscription; subscribing on a
    /// closed bus yields a stream that is already closed.
    pub fn subscribe_with_buffer(&self, buffer: usize) -> EventStream {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        {
            // Closed check under the write lock so close() cannot race a
            // subscriber into a cleared registry.
            let mut subscribers = self.inner.subscribers.write();
            if !self.inner.closed.load(Ordering::Acquire) {
                subscribers.push(Subscriber { id, tx });
            }
        }
        EventStream {
            id,
            rx,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Stamp and deliver an event to every current subscriber.
    ///
    /// No-op once the bus is closed.
    pub async fn publish(&self, kind: EventKind) {
        if self.inner.closed.load(Ordering::Acquire) {
            return;
        }
        let event = Event::new(self.inner.clock.epoch_ms(), kind);
        let critical = event.is_critical();

        // Snapshot the senders so a critical (awaiting) send never holds
        // the registry lock.
        let targets: Vec<(u64, mpsc::Sender<Event>)> = self
            .inner
            .subscribers
            .read()
            .iter()
            .map(|subscriber| (subscriber.id, subscriber.tx.clone()))
            .collect();

        let mut gone = Vec::new();
        for (id, tx) in targets {
            if critical {
                if tx.send(event.clone()).await.is_err() {
                    gone.push(id);
                }
            } else {
                match tx.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(dropped)) => {
                        trace!(event = dropped.kind.name(), subscriber = id, "event dropped");
                    }
                    Err(TrySendError::Closed(_)) => gone.push(id),
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

    /// Close the bus: all subscriber streams end, later publishes are
    /// no-ops. Idempotent.
    pub fn close(&self) {
        let mut subscribers = self.inner.subscribers.write();
        self.inner.closed.store(true, Ordering::Release);
        subscribers.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's delivery stream.
pub struct EventStream {
    id: u64,
    rx: mpsc::Receiver<Event>,
    inner: Arc<BusInner>,
}

impl EventStream {
    /// Receive the next event; `None` once the bus is closed and the
    /// buffer is drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.inner
            .subscribers
            .write()
            .retain(|subscriber| subscriber.id != self.id);
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
