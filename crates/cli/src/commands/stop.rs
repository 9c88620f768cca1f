// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fuku stop`: signal the active session's processes.

use anyhow::Result;
use fuku_engine::{env, process_alive, SessionRegistry};
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;

pub async fn stop() -> Result<()> {
    let registry = SessionRegistry::new(&env::state_dir()?);
    let Some(record) = registry.load()? else {
        println!("No active session found");
        return Ok(());
    };

    println!(
        "Stopping profile '{}' ({} services)",
        record.profile,
        record.services.len()
    );

    let mut signalled = 0;
    for (name, entry) in &record.services {
        if !process_alive(entry.pid) {
            continue;
        }
        // Children are process-group leaders; fall back to a plain kill
        // for anything that is not.
        let pid = Pid::from_raw(entry.pid as i32);
        if killpg(pid, Signal::SIGTERM).is_err() {
            let _ = kill(pid, Signal::SIGTERM);
        }
        println!("  {name} (pid {}) signalled", entry.pid);
        signalled += 1;
    }

    if signalled == 0 {
        println!("No running processes to signal");
    }
    Ok(())
}
