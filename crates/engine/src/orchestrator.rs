// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level orchestration.
//!
//! The orchestrator owns the global phase and the session registry, wires
//! every other component together, and is the sole authoritative executor
//! of commands. Signals are translated into bus traffic by a dedicated
//! task; no handler touches core state directly.
//!
//! Startup order matters: orphans are killed and the stale session file is
//! removed before the first supervisor exists, and the session reactor
//! subscribes before any service can start so no `service_starting` event
//! is missed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fuku_core::{
    Clock, Command, EventKind, Phase, ResolvedProfile, SessionEntry, SessionRecord, SystemClock,
};
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bus::{EventBus, EventStream};
use crate::command_bus::{CommandBus, CommandStream};
use crate::coordinator::{run_tiers, TierOutcome};
use crate::error::EngineError;
use crate::log_writer::{AllowAll, LogFilter, LogWriter};
use crate::session::SessionRegistry;
use crate::supervisor::{Supervisor, SupervisorHandle};
use crate::watch::{self, ServiceWatcher};

/// Second signal inside this window force-kills every tracked PID.
const FORCE_KILL_WINDOW: Duration = Duration::from_secs(2);

/// Default bound on waiting for all services to stop.
const STOP_ALL_TIMEOUT: Duration = Duration::from_secs(15);

/// Why the run ended; the CLI maps this onto an exit code.
///
/// SIGTERM asks for a graceful shutdown and, when it completes, counts as
/// `Clean`; only an interrupt carries the conventional 130.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Clean shutdown (stop command, stop-all, or graceful SIGTERM).
    Clean,
    /// A tier failed and abort-on-tier-failure converted it to shutdown.
    TierFailure,
    /// SIGINT triggered the shutdown.
    Interrupted,
}

pub struct OrchestratorOptions {
    pub log_path: PathBuf,
    pub log_filter: Arc<dyn LogFilter>,
    /// Bound on the stop-all shutdown wait.
    pub stop_all_timeout: Duration,
    /// Install SIGINT/SIGTERM handlers; disabled by in-process tests.
    pub handle_signals: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            log_path: crate::env::log_path(),
            log_filter: Arc::new(AllowAll),
            stop_all_timeout: STOP_ALL_TIMEOUT,
            handle_signals: true,
        }
    }
}

pub struct Orchestrator {
    profile: ResolvedProfile,
    bus: EventBus,
    commands: CommandBus,
    registry: Arc<SessionRegistry>,
    clock: Arc<dyn Clock>,
    options: OrchestratorOptions,
    cancel: CancellationToken,
    phase: Phase,
}

impl Orchestrator {
    pub fn new(
        profile: ResolvedProfile,
        bus: EventBus,
        commands: CommandBus,
        registry: SessionRegistry,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            profile,
            bus,
            commands,
            registry: Arc::new(registry),
            clock: Arc::new(SystemClock),
            options,
            cancel: CancellationToken::new(),
            phase: Phase::Startup,
        }
    }

    /// Root cancellation token; cancelling it tears the whole run down.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the orchestration to completion.
    pub async fn run(mut self) -> Result<RunOutcome, EngineError> {
        // Orphan cleanup happens before any supervisor is constructed.
        match self.registry.load() {
            Ok(Some(record)) => {
                let killed = self.registry.kill_orphans(&record).await;
                if killed > 0 {
                    info!(killed, "cleaned up orphans from a previous session");
                }
                self.registry.delete()?;
            }
            Ok(None) => {}
            Err(error) => warn!(%error, "could not read previous session file"),
        }

        self.bus
            .publish(EventKind::PhaseChanged {
                phase: Phase::Startup,
            })
            .await;
        self.bus
            .publish(EventKind::ProfileResolved {
                profile: self.profile.name.clone(),
                tiers: self.profile.summaries(),
            })
            .await;

        self.registry
            .save(&SessionRecord::new(&self.profile.name, Utc::now()))?;

        let log_writer = LogWriter::spawn(
            &self.bus,
            self.options.log_path.clone(),
            Arc::clone(&self.options.log_filter),
            self.cancel.child_token(),
        );

        let reactor = tokio::spawn(session_reactor(
            self.bus.subscribe(),
            Arc::clone(&self.registry),
            self.cancel.child_token(),
        ));

        // Subscribe before watchers or signal handlers can publish.
        let commands_rx = self.commands.subscribe();

        let mut supervisors = HashMap::new();
        for def in self.profile.services() {
            let handle = Supervisor::spawn(
                def.clone(),
                self.bus.clone(),
                Arc::clone(&self.clock),
                self.cancel.child_token(),
            );
            supervisors.insert(def.name.clone(), handle);
        }

        let watchers = watch::spawn_all(
            self.profile.services().cloned(),
            &self.bus,
            &self.commands,
            &self.cancel.child_token(),
        );

        let stop_requested = CancellationToken::new();
        let interrupted = Arc::new(AtomicBool::new(false));
        if self.options.handle_signals {
            spawn_signal_task(SignalTask {
                bus: self.bus.clone(),
                commands: self.commands.clone(),
                registry: Arc::clone(&self.registry),
                stop_requested: stop_requested.clone(),
                interrupted: Arc::clone(&interrupted),
                cancel: self.cancel.child_token(),
            })?;
        }

        let outcome = run_tiers(&self.profile, &supervisors, &self.bus, &stop_requested).await;

        let tier_failure = match outcome {
            TierOutcome::AllReady => {
                self.set_phase(Phase::Running).await;
                info!(profile = %self.profile.name, "all tiers ready");
                self.command_loop(&supervisors, commands_rx, &stop_requested)
                    .await;
                false
            }
            TierOutcome::TierFailed { tier } => {
                warn!(tier = %tier, "tier failed, shutting down");
                true
            }
            TierOutcome::Cancelled => false,
        };

        self.shutdown(&supervisors, watchers, log_writer, reactor)
            .await;

        if tier_failure {
            Ok(RunOutcome::TierFailure)
        } else if interrupted.load(Ordering::Relaxed) {
            Ok(RunOutcome::Interrupted)
        } else {
            Ok(RunOutcome::Clean)
        }
    }

    /// Steady-state loop: consume commands until a stop is requested.
    async fn command_loop(
        &self,
        supervisors: &HashMap<String, SupervisorHandle>,
        mut commands: CommandStream,
        stop_requested: &CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = stop_requested.cancelled() => return,
                command = commands.recv() => {
                    let Some(command) = command else { return };
                    match command {
                        Command::StopService { service } => {
                            match supervisors.get(&service) {
                                Some(handle) => handle.stop().await,
                                None => warn!(service = %service, "stop for unknown service"),
                            }
                        }
                        Command::RestartService { service } => {
                            match supervisors.get(&service) {
                                Some(handle) => handle.restart().await,
                                None => warn!(service = %service, "restart for unknown service"),
                            }
                        }
                        Command::StopAll => return,
                    }
                }
            }
        }
    }

    /// Stop everything: services in reverse tier order with a bounded
    /// wait, then watchers, background tasks, and the session file. Ends
    /// with the final `phase_changed(stopped)` event and closes both buses.
    async fn shutdown(
        &mut self,
        supervisors: &HashMap<String, SupervisorHandle>,
        watchers: Vec<ServiceWatcher>,
        log_writer: LogWriter,
        reactor: tokio::task::JoinHandle<()>,
    ) {
        self.set_phase(Phase::Stopping).await;

        let deadline = tokio::time::Instant::now() + self.options.stop_all_timeout;
        for tier in self.profile.tiers.iter().rev() {
            for service in &tier.services {
                if let Some(handle) = supervisors.get(&service.name) {
                    handle.stop().await;
                }
            }
            for service in &tier.services {
                let Some(handle) = supervisors.get(&service.name) else {
                    continue;
                };
                if tokio::time::timeout_at(deadline, handle.wait_stopped())
                    .await
                    .is_err()
                {
                    warn!(service = %service.name, "did not stop within the shutdown budget");
                }
            }
        }

        for watcher in watchers {
            watcher.close().await;
        }

        self.cancel.cancel();
        let _ = reactor.await;
        log_writer.shutdown().await;

        if let Err(error) = self.registry.delete() {
            warn!(%error, "failed to delete session file");
        }

        self.set_phase(Phase::Stopped).await;
        self.bus.close();
        self.commands.close();
    }

    /// Monotonic phase transition, published as a critical event.
    async fn set_phase(&mut self, phase: Phase) {
        if phase <= self.phase {
            return;
        }
        self.phase = phase;
        self.bus.publish(EventKind::PhaseChanged { phase }).await;
    }
}

/// Keep the session registry in step with lifecycle events.
async fn session_reactor(
    mut events: EventStream,
    registry: Arc<SessionRegistry>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            event = events.recv() => {
                let Some(event) = event else { return };
                match event.kind {
                    EventKind::ServiceStarting { service, pid, .. } => {
                        let entry = SessionEntry {
                            pid,
                            started_at: Utc::now(),
                        };
                        if let Err(error) = registry.add(&service, entry) {
                            warn!(service = %service, %error, "failed to record service pid");
                        }
                    }
                    EventKind::ServiceStopped { service, .. } => {
                        if let Err(error) = registry.remove(&service) {
                            warn!(service = %service, %error, "failed to drop service pid");
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

struct SignalTask {
    bus: EventBus,
    commands: CommandBus,
    registry: Arc<SessionRegistry>,
    stop_requested: CancellationToken,
    interrupted: Arc<AtomicBool>,
    cancel: CancellationToken,
}

/// Translate OS signals into bus traffic: first signal publishes `signal`
/// and `stop_all`; a second one within [`FORCE_KILL_WINDOW`] SIGKILLs every
/// tracked PID.
fn spawn_signal_task(task: SignalTask) -> Result<(), EngineError> {
    let mut sigterm = signal(SignalKind::terminate()).map_err(EngineError::Signal)?;
    let mut sigint = signal(SignalKind::interrupt()).map_err(EngineError::Signal)?;

    tokio::spawn(async move {
        let mut last: Option<tokio::time::Instant> = None;
        loop {
            let name = tokio::select! {
                _ = task.cancel.cancelled() => return,
                _ = sigterm.recv() => "terminated",
                _ = sigint.recv() => "interrupted",
            };
            if name == "interrupted" {
                task.interrupted.store(true, Ordering::Relaxed);
            }

            let now = tokio::time::Instant::now();
            if let Some(previous) = last {
                if now.duration_since(previous) <= FORCE_KILL_WINDOW {
                    warn!("second signal, force-killing all tracked processes");
                    force_kill(&task.registry);
                    continue;
                }
            }
            last = Some(now);

            info!(signal = name, "shutdown signal received");
            task.bus
                .publish(EventKind::Signal {
                    signal: name.to_string(),
                })
                .await;
            task.commands.publish(Command::StopAll);
            task.stop_requested.cancel();
        }
    });
    Ok(())
}

/// SIGKILL every PID recorded in the session, process group first.
fn force_kill(registry: &SessionRegistry) {
    let Ok(Some(record)) = registry.load() else {
        return;
    };
    for pid in record.pids() {
        let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGKILL);
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
