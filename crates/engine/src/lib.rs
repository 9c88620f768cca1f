// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The fuku supervision engine.
//!
//! Everything that launches, observes, restarts, and stops managed
//! processes lives here: the event and command buses, the session
//! registry, the log writer, the readiness prober, the process runner,
//! the file watcher, the per-service supervisor, the tier coordinator,
//! and the top-level orchestrator.
//!
//! Tasks communicate exclusively through the buses and per-supervisor
//! mailboxes; every long-running task honours a cancellation token
//! derived from the orchestrator's root token.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod backoff;
mod bus;
mod command_bus;
mod coordinator;
pub mod env;
mod error;
mod log_writer;
mod orchestrator;
mod probe;
mod runner;
mod session;
mod supervisor;
mod transition;
mod watch;

pub use bus::{EventBus, EventStream, DEFAULT_SUBSCRIBER_BUFFER};
pub use command_bus::{CommandBus, CommandStream};
pub use coordinator::{run_tiers, TierOutcome};
pub use error::EngineError;
pub use log_writer::{AllowAll, LogFilter, LogWriter, ServiceFilter};
pub use orchestrator::{Orchestrator, OrchestratorOptions, RunOutcome};
pub use probe::{ProbeOutcome, Prober};
pub use runner::{RunnerExit, RunnerHandle, DEFAULT_STOP_GRACE, MAX_LINE_LEN};
pub use session::{process_alive, SessionError, SessionRegistry};
pub use supervisor::{PhaseView, Settled, Supervisor, SupervisorHandle};
pub use watch::ServiceWatcher;
