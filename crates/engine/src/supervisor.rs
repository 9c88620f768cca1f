// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-service supervisor.
//!
//! One task per service owns that service's runtime state and is the only
//! thing that mutates it. Lifecycle inputs (start/stop/restart requests,
//! runner exits, probe resolutions, retry timers) arrive through a mailbox
//! and are resolved against the pure transition table in [`crate::transition`];
//! the supervisor executes the resulting effects: spawning the runner and
//! prober, signalling the child, publishing lifecycle events, and arming
//! retry backoff.
//!
//! Runner exits and probe resolutions are tagged with a launch epoch so a
//! message from an abandoned child or a stale probe can never corrupt the
//! current state.

use std::sync::Arc;
use std::time::Duration;

use fuku_core::{Clock, EventKind, ServiceDef, ServiceError, ServicePhase, ServiceState};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::backoff;
use crate::bus::EventBus;
use crate::probe::{ProbeOutcome, Prober};
use crate::runner::{self, RunnerExit, RunnerHandle, DEFAULT_STOP_GRACE};
use crate::transition::{step, FailCause, SmEffect, SmInput};

const MAILBOX_DEPTH: usize = 32;

/// Lifecycle inputs delivered through the supervisor mailbox.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Input {
    Start,
    Stop,
    Restart,
    RunnerExited { epoch: u64, exit: RunnerExit },
    ProberResolved { epoch: u64, outcome: ProbeOutcome },
    RetryExpired { epoch: u64 },
}

/// Snapshot of a supervisor's observable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseView {
    pub phase: ServicePhase,
    pub attempt: u32,
    /// True while a retry is scheduled out of `Failed`.
    pub retry_pending: bool,
}

/// How a service settled after a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Running,
    /// Terminal failure: retries exhausted or start impossible.
    Failed,
    /// Stopped (or cancelled) before reaching readiness.
    Stopped,
}

/// Cheap cloneable handle to one supervisor.
#[derive(Clone)]
pub struct SupervisorHandle {
    name: String,
    tier: String,
    tx: mpsc::Sender<Input>,
    phase_rx: watch::Receiver<PhaseView>,
}

impl SupervisorHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tier(&self) -> &str {
        &self.tier
    }

    pub async fn start(&self) {
        let _ = self.tx.send(Input::Start).await;
    }

    pub async fn stop(&self) {
        let _ = self.tx.send(Input::Stop).await;
    }

    pub async fn restart(&self) {
        let _ = self.tx.send(Input::Restart).await;
    }

    /// Current observable state.
    pub fn view(&self) -> PhaseView {
        *self.phase_rx.borrow()
    }

    /// Wait until the service is `Running`, terminally `Failed`, or was
    /// stopped before settling. Used by the tier coordinator.
    pub async fn wait_settled(&self, cancel: &CancellationToken) -> Settled {
        let mut rx = self.phase_rx.clone();
        loop {
            let view = *rx.borrow_and_update();
            match view.phase {
                ServicePhase::Running => return Settled::Running,
                ServicePhase::Failed if !view.retry_pending => return Settled::Failed,
                // attempt 0 is the initial state before our own start
                // request has been processed; it never counts as settled.
                ServicePhase::Stopped if view.attempt > 0 => return Settled::Stopped,
                _ => {}
            }
            tokio::select! {
                _ = cancel.cancelled() => return Settled::Stopped,
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Settled::Stopped;
                    }
                }
            }
        }
    }

    /// Wait until the service reaches `Stopped`. Callers bound this with a
    /// timeout.
    pub async fn wait_stopped(&self) {
        let mut rx = self.phase_rx.clone();
        loop {
            if rx.borrow_and_update().phase == ServicePhase::Stopped {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

pub struct Supervisor;

impl Supervisor {
    /// Spawn the supervisor task for one service.
    ///
    /// Cancelling `cancel` drives the service to `Stopped` and ends the
    /// task.
    pub fn spawn(
        def: ServiceDef,
        bus: EventBus,
        clock: Arc<dyn Clock>,
        cancel: CancellationToken,
    ) -> SupervisorHandle {
        let (tx, rx) = mpsc::channel(MAILBOX_DEPTH);
        let (phase_tx, phase_rx) = watch::channel(PhaseView {
            phase: ServicePhase::Stopped,
            attempt: 0,
            retry_pending: false,
        });
        let handle = SupervisorHandle {
            name: def.name.clone(),
            tier: def.tier.clone(),
            tx: tx.clone(),
            phase_rx,
        };
        let task = SupervisorTask {
            def,
            bus,
            clock,
            cancel,
            rx,
            self_tx: tx,
            phase_tx,
            state: ServiceState::new(),
            epoch: 0,
            retry_epoch: 0,
            retry_pending: false,
            last_exit: None,
            runner: None,
            prober_cancel: None,
            stop_grace: DEFAULT_STOP_GRACE,
        };
        tokio::spawn(task.run());
        handle
    }
}

struct SupervisorTask {
    def: ServiceDef,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
    rx: mpsc::Receiver<Input>,
    self_tx: mpsc::Sender<Input>,
    phase_tx: watch::Sender<PhaseView>,
    state: ServiceState,
    /// Launch generation; stale runner/prober messages carry an old epoch.
    epoch: u64,
    /// Retry generation; a cancelled retry's timer carries an old epoch.
    retry_epoch: u64,
    retry_pending: bool,
    last_exit: Option<RunnerExit>,
    runner: Option<RunnerHandle>,
    prober_cancel: Option<CancellationToken>,
    stop_grace: Duration,
}

impl SupervisorTask {
    async fn run(mut self) {
        let cancel = self.cancel.clone();
        let mut draining = false;
        loop {
            tokio::select! {
                _ = cancel.cancelled(), if !draining => {
                    draining = true;
                    self.handle(Input::Stop).await;
                }
                input = self.rx.recv() => match input {
                    Some(input) => self.handle(input).await,
                    None => break,
                },
            }
            if draining && !self.state.phase.has_child() {
                // A failed service settles to Stopped on teardown.
                if self.state.phase == ServicePhase::Failed {
                    self.handle(Input::Stop).await;
                }
                break;
            }
        }
    }

    async fn handle(&mut self, input: Input) {
        let sm_input = match input {
            Input::Start => SmInput::Start,
            Input::Stop => SmInput::Stop,
            Input::Restart => SmInput::Restart,
            Input::RunnerExited { epoch, exit } => {
                if epoch != self.epoch {
                    return;
                }
                self.last_exit = Some(exit);
                SmInput::RunnerExited
            }
            Input::ProberResolved { epoch, outcome } => {
                if epoch != self.epoch {
                    return;
                }
                match outcome {
                    ProbeOutcome::Ready => SmInput::ProberReady,
                    ProbeOutcome::TimedOut => SmInput::ProberTimedOut,
                }
            }
            Input::RetryExpired { epoch } => {
                if epoch != self.retry_epoch || !self.retry_pending {
                    return;
                }
                SmInput::RetryExpired
            }
        };

        let resolved = step(self.state.phase, self.state.attempt, sm_input);
        debug!(
            service = %self.def.name,
            from = %self.state.phase,
            to = %resolved.next,
            input = ?sm_input,
            "lifecycle transition"
        );
        self.state.phase = resolved.next;
        self.state.attempt = resolved.attempt;
        if resolved.next != ServicePhase::Failed {
            self.retry_pending = false;
        }
        for effect in resolved.effects {
            self.apply(effect).await;
        }
        self.publish_view();
    }

    async fn apply(&mut self, effect: SmEffect) {
        match effect {
            SmEffect::Launch { attempt } => self.launch(attempt).await,
            SmEffect::CancelProber => {
                if let Some(cancel) = self.prober_cancel.take() {
                    cancel.cancel();
                }
            }
            SmEffect::StopChild => {
                if let Some(runner) = self.runner.clone() {
                    let grace = self.stop_grace;
                    tokio::spawn(async move {
                        let mut runner = runner;
                        runner.stop(grace).await;
                    });
                }
            }
            SmEffect::PublishReady => {
                self.state.ready_at_ms = self.clock.epoch_ms();
                let duration_ms = self
                    .state
                    .ready_at_ms
                    .saturating_sub(self.state.started_at_ms);
                self.bus
                    .publish(EventKind::ServiceReady {
                        service: self.def.name.clone(),
                        tier: self.def.tier.clone(),
                        duration_ms,
                    })
                    .await;
            }
            SmEffect::PublishStopped => {
                self.state.pid = 0;
                self.runner = None;
                self.bus
                    .publish(EventKind::ServiceStopped {
                        service: self.def.name.clone(),
                        tier: self.def.tier.clone(),
                    })
                    .await;
            }
            SmEffect::PublishRestarting => {
                self.bus
                    .publish(EventKind::ServiceRestarting {
                        service: self.def.name.clone(),
                    })
                    .await;
            }
            SmEffect::Fail { cause } => self.fail(cause).await,
        }
    }

    /// Spawn runner and prober for one start attempt.
    async fn launch(&mut self, attempt: u32) {
        self.epoch += 1;
        let epoch = self.epoch;
        self.last_exit = None;

        // Subscribe the prober before the child exists so the readiness
        // line can never slip past it.
        let prober = Prober::new(
            &self.def.name,
            &self.def.readiness,
            &self.bus,
            Arc::clone(&self.clock),
        );

        match runner::spawn(&self.def, &self.bus, &self.clock) {
            Ok(handle) => {
                self.state.pid = handle.pid();
                self.state.started_at_ms = handle.started_at_ms();
                self.state.last_error = None;
                self.bus
                    .publish(EventKind::ServiceStarting {
                        service: self.def.name.clone(),
                        tier: self.def.tier.clone(),
                        attempt,
                        pid: handle.pid(),
                    })
                    .await;

                let mut exit_watch = handle.clone();
                let exit_tx = self.self_tx.clone();
                tokio::spawn(async move {
                    let exit = exit_watch.wait().await;
                    let _ = exit_tx.send(Input::RunnerExited { epoch, exit }).await;
                });

                let prober_cancel = CancellationToken::new();
                self.prober_cancel = Some(prober_cancel.clone());
                let probe_tx = self.self_tx.clone();
                tokio::spawn(async move {
                    if let Some(outcome) = prober.run(prober_cancel).await {
                        let _ = probe_tx
                            .send(Input::ProberResolved { epoch, outcome })
                            .await;
                    }
                });

                self.runner = Some(handle);
            }
            Err(error) => {
                drop(prober);
                self.state.phase = ServicePhase::Failed;
                self.fail_with(error).await;
            }
        }
    }

    /// Map a failure cause onto a concrete error and run the retry policy.
    async fn fail(&mut self, cause: FailCause) {
        let port_conflict = self
            .runner
            .as_ref()
            .is_some_and(|runner| runner.port_conflict());
        let error = if port_conflict {
            // Treated like a failed start; surfaced with its own message.
            ServiceError::PortAlreadyInUse
        } else {
            match cause {
                FailCause::Exited => ServiceError::ProcessExited {
                    code: self.last_exit.and_then(|exit| exit.code),
                },
                FailCause::ReadinessTimeout => ServiceError::ReadinessTimeout {
                    timeout_secs: self.def.readiness.timeout().as_secs(),
                },
            }
        };
        self.fail_with(error).await;
    }

    async fn fail_with(&mut self, error: ServiceError) {
        // Anything the abandoned child still sends is stale from here on.
        self.epoch += 1;
        self.state.pid = 0;
        self.runner = None;
        if let Some(cancel) = self.prober_cancel.take() {
            cancel.cancel();
        }
        self.state.last_error = Some(error.clone());
        self.bus
            .publish(EventKind::ServiceFailed {
                service: self.def.name.clone(),
                tier: self.def.tier.clone(),
                error: error.to_string(),
            })
            .await;

        let max = self.def.retry.max_attempts;
        if self.state.attempt < max {
            let next_attempt = self.state.attempt + 1;
            self.bus
                .publish(EventKind::RetryScheduled {
                    service: self.def.name.clone(),
                    attempt: next_attempt,
                    max,
                })
                .await;
            self.retry_epoch += 1;
            self.retry_pending = true;
            let delay =
                backoff::retry_delay(&self.def.retry, next_attempt, self.clock.epoch_ms());
            let retry_epoch = self.retry_epoch;
            let timer_tx = self.self_tx.clone();
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {
                        let _ = timer_tx.send(Input::RetryExpired { epoch: retry_epoch }).await;
                    }
                }
            });
        } else {
            self.bus
                .publish(EventKind::ServiceFailed {
                    service: self.def.name.clone(),
                    tier: self.def.tier.clone(),
                    error: ServiceError::MaxRetriesExceeded.to_string(),
                })
                .await;
        }
    }

    fn publish_view(&self) {
        self.phase_tx.send_replace(PhaseView {
            phase: self.state.phase,
            attempt: self.state.attempt,
            retry_pending: self.retry_pending,
        });
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
