// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-service lifecycle state machine, as a pure transition table.
//!
//! ```text
//! Stopped  --start-->  Starting  --ready-->  Running  --stop-->     Stopping  --exited-->  Stopped
//!    ^                     |                    |                                              |
//!    |                     v                 --restart-->  Restarting  --exited--> Starting <--'
//!    |                  Failed
//!    |                     |
//!    +-----restart---------+
//! ```
//!
//! [`step`] maps `(phase, input)` to the next phase plus a list of effects;
//! the supervisor executes the effects (spawning, signalling, publishing)
//! and owns all runtime data. Inputs that are not valid in the current
//! phase produce an empty step: stale or duplicate inputs are ignored, not
//! errors.

use fuku_core::ServicePhase;

/// Lifecycle inputs, already filtered for staleness by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SmInput {
    /// External start request (tier coordinator or user).
    Start,
    /// External stop request.
    Stop,
    /// External restart request (user or watcher).
    Restart,
    /// The child process exited.
    RunnerExited,
    /// The readiness probe resolved `Ready`.
    ProberReady,
    /// The readiness probe resolved `TimedOut`.
    ProberTimedOut,
    /// The retry backoff timer fired.
    RetryExpired,
}

/// What failed, for the supervisor to map onto a concrete error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailCause {
    Exited,
    ReadinessTimeout,
}

/// Side effects the supervisor must perform, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SmEffect {
    /// Spawn runner and prober for attempt `attempt`; publishes
    /// `service_starting`.
    Launch { attempt: u32 },
    /// Abort the in-flight readiness probe.
    CancelProber,
    /// SIGTERM the child (grace then SIGKILL) in the background.
    StopChild,
    /// Publish `service_ready`.
    PublishReady,
    /// Publish `service_stopped`.
    PublishStopped,
    /// Publish `service_restarting`.
    PublishRestarting,
    /// Enter the failure path: publish `service_failed` and evaluate the
    /// retry policy.
    Fail { cause: FailCause },
}

/// One resolved transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SmStep {
    pub next: ServicePhase,
    pub attempt: u32,
    pub effects: Vec<SmEffect>,
}

impl SmStep {
    fn ignore(phase: ServicePhase, attempt: u32) -> Self {
        Self {
            next: phase,
            attempt,
            effects: Vec::new(),
        }
    }
}

/// Resolve `(phase, input)` into the next phase and its effects.
///
/// `attempt` is the current start attempt (0 before the first start).
pub(crate) fn step(phase: ServicePhase, attempt: u32, input: SmInput) -> SmStep {
    use ServicePhase::*;
    use SmInput::*;

    match (phase, input) {
        // Starting from rest. External restarts from rest reset the
        // attempt counter; retries never pass through here.
        (Stopped | Failed, Start | Restart) => SmStep {
            next: Starting,
            attempt: 1,
            effects: vec![SmEffect::Launch { attempt: 1 }],
        },

        // Readiness resolution.
        (Starting, ProberReady) => SmStep {
            next: Running,
            attempt,
            effects: vec![SmEffect::PublishReady],
        },
        (Starting, ProberTimedOut) => SmStep {
            next: Failed,
            attempt,
            effects: vec![
                SmEffect::StopChild,
                SmEffect::Fail {
                    cause: FailCause::ReadinessTimeout,
                },
            ],
        },

        // Unexpected child exit: before readiness or while running.
        (Starting, RunnerExited) => SmStep {
            next: Failed,
            attempt,
            effects: vec![
                SmEffect::CancelProber,
                SmEffect::Fail {
                    cause: FailCause::Exited,
                },
            ],
        },
        (Running, RunnerExited) => SmStep {
            next: Failed,
            attempt,
            effects: vec![SmEffect::Fail {
                cause: FailCause::Exited,
            }],
        },

        // Requested stop.
        (Starting, Stop) => SmStep {
            next: Stopping,
            attempt,
            effects: vec![SmEffect::CancelProber, SmEffect::StopChild],
        },
        (Running, Stop) => SmStep {
            next: Stopping,
            attempt,
            effects: vec![SmEffect::StopChild],
        },
        // Stopping a failed service just settles it; there is no child.
        (Failed, Stop) => SmStep {
            next: Stopped,
            attempt,
            effects: vec![SmEffect::PublishStopped],
        },
        // A stop during a restart wins: the pending relaunch is dropped.
        (Restarting, Stop) => SmStep {
            next: Stopping,
            attempt,
            effects: Vec::new(),
        },

        // Requested restart of a live service. The attempt counter is
        // deliberately preserved.
        (Starting, Restart) => SmStep {
            next: Restarting,
            attempt,
            effects: vec![
                SmEffect::PublishRestarting,
                SmEffect::CancelProber,
                SmEffect::StopChild,
            ],
        },
        (Running, Restart) => SmStep {
            next: Restarting,
            attempt,
            effects: vec![SmEffect::PublishRestarting, SmEffect::StopChild],
        },

        // Child exit completes a stop or restart.
        (Stopping, RunnerExited) => SmStep {
            next: Stopped,
            attempt,
            effects: vec![SmEffect::PublishStopped],
        },
        (Restarting, RunnerExited) => SmStep {
            next: Starting,
            attempt,
            effects: vec![SmEffect::PublishStopped, SmEffect::Launch { attempt }],
        },

        // Scheduled retry fires.
        (Failed, RetryExpired) => SmStep {
            next: Starting,
            attempt: attempt + 1,
            effects: vec![SmEffect::Launch {
                attempt: attempt + 1,
            }],
        },

        // Everything else is a stale or redundant input.
        _ => SmStep::ignore(phase, attempt),
    }
}

#[cfg(test)]
#[path = "transition_tests.rs"]
mod tests;
