// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Readiness probing.
//!
//! Three strategies: `none` resolves immediately, `log` watches the
//! service's own log lines for a pattern, `http` polls a URL until it
//! answers with a status in [200, 400). Every strategy resolves exactly
//! once, to `Ready` or `TimedOut`, or not at all when cancelled.

use std::sync::Arc;
use std::time::Duration;

use fuku_core::{Clock, EventKind, Readiness};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::bus::{EventBus, EventStream};

/// Per-request deadline for HTTP probe attempts.
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// First delay between HTTP attempts; doubles up to the cap.
const HTTP_BACKOFF_INITIAL: Duration = Duration::from_millis(100);

/// Upper bound on the delay between HTTP attempts.
const HTTP_BACKOFF_CAP: Duration = Duration::from_secs(1);

/// Buffer for the log-probe subscription; sized generously so a chatty
/// service cannot push the readiness line out before the probe runs.
const LOG_PROBE_BUFFER: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ready,
    TimedOut,
}

enum Mode {
    None,
    Log {
        pattern: String,
        timeout: Duration,
        events: EventStream,
    },
    Http {
        url: String,
        timeout: Duration,
    },
}

/// A readiness probe for one start attempt of one service.
///
/// Construction subscribes synchronously for the log strategy, so the
/// probe sees lines emitted from the moment the runner spawns even if
/// [`Prober::run`] is scheduled later.
pub struct Prober {
    service: String,
    mode: Mode,
    clock: Arc<dyn Clock>,
}

impl Prober {
    pub fn new(
        service: &str,
        readiness: &Readiness,
        bus: &EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mode = match readiness {
            Readiness::None => Mode::None,
            Readiness::Log { pattern, timeout } => Mode::Log {
                pattern: pattern.clone(),
                timeout: *timeout,
                events: bus.subscribe_with_buffer(LOG_PROBE_BUFFER),
            },
            Readiness::Http { url, timeout } => Mode::Http {
                url: url.clone(),
                timeout: *timeout,
            },
        };
        Self {
            service: service.to_string(),
            mode,
            clock,
        }
    }

    /// Resolve the probe. Returns `None` when cancelled first; the caller
    /// must treat that as "no resolution", not as a timeout.
    pub async fn run(self, cancel: CancellationToken) -> Option<ProbeOutcome> {
        match self.mode {
            Mode::None => Some(ProbeOutcome::Ready),
            Mode::Log {
                pattern,
                timeout,
                events,
            } => watch_log(&self.service, &pattern, timeout, events, cancel).await,
            Mode::Http { url, timeout } => {
                poll_http(&self.service, &url, timeout, self.clock, cancel).await
            }
        }
    }
}

async fn watch_log(
    service: &str,
    pattern: &str,
    timeout: Duration,
    mut events: EventStream,
    cancel: CancellationToken,
) -> Option<ProbeOutcome> {
    let deadline = Instant::now() + timeout;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep_until(deadline) => return Some(ProbeOutcome::TimedOut),
            event = events.recv() => {
                let event = event?;
                if let EventKind::LogLine { service: from, message, .. } = &event.kind {
                    if from == service && message.contains(pattern) {
                        debug!(service, pattern, "readiness pattern matched");
                        return Some(ProbeOutcome::Ready);
                    }
                }
            }
        }
    }
}

async fn poll_http(
    service: &str,
    url: &str,
    timeout: Duration,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
) -> Option<ProbeOutcome> {
    let deadline = Instant::now() + timeout;
    let client = reqwest::Client::new();
    let mut delay = HTTP_BACKOFF_INITIAL;
    let started = clock.now();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep_until(deadline) => return Some(ProbeOutcome::TimedOut),
            result = client.get(url).timeout(HTTP_REQUEST_TIMEOUT).send() => {
                if let Ok(response) = result {
                    let status = response.status().as_u16();
                    if (200..400).contains(&status) {
                        debug!(
                            service,
                            status,
                            elapsed_ms = clock.now().duration_since(started).as_millis() as u64,
                            "http readiness probe succeeded"
                        );
                        return Some(ProbeOutcome::Ready);
                    }
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep_until(deadline) => return Some(ProbeOutcome::TimedOut),
            _ = tokio::time::sleep(delay) => {}
        }
        delay = (delay * 2).min(HTTP_BACKOFF_CAP);
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
