// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fuku logs`: banner plus live follow of the log scratch file.

use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

use anyhow::Result;
use clap::Args;
use fuku_engine::{env, process_alive, SessionRegistry};
use notify::{Event as NotifyEvent, EventKind as FsEventKind, RecursiveMode, Watcher};

#[derive(Args)]
pub struct LogsArgs {
    /// Profile whose session to follow
    pub profile: String,

    /// Only show lines from these services
    pub services: Vec<String>,
}

pub async fn logs(args: LogsArgs) -> Result<()> {
    let registry = SessionRegistry::new(&env::state_dir()?);
    let Some(record) = registry.load()? else {
        println!("No active session found");
        return Ok(());
    };

    if record.profile != args.profile {
        println!(
            "note: active session runs profile '{}' (requested '{}')",
            record.profile, args.profile
        );
    }

    // Banner: profile, service list, live count.
    println!("profile: {}", record.profile);
    println!("services:");
    let mut running = 0;
    for (name, entry) in &record.services {
        let alive = process_alive(entry.pid);
        if alive {
            running += 1;
        }
        let marker = if alive { "running" } else { "stopped" };
        println!("  {name} (pid {}) {marker}", entry.pid);
    }
    println!("{running} running");
    println!();

    follow(&env::log_path(), &args.services).await
}

fn selected(line: &str, services: &[String]) -> bool {
    if services.is_empty() {
        return true;
    }
    services
        .iter()
        .any(|service| line.starts_with(&format!("[{service}]")))
}

/// Print the existing file content, then follow appends until ctrl-c.
async fn follow(path: &Path, services: &[String]) -> Result<()> {
    let mut position = 0u64;

    // Existing content first; the file may not exist yet if the run is
    // still starting.
    if let Ok(file) = std::fs::File::open(path) {
        let mut reader = BufReader::new(file);
        let mut line = String::new();
        while reader.read_line(&mut line)? > 0 {
            if selected(&line, services) {
                print!("{line}");
            }
            line.clear();
        }
        position = reader.stream_position()?;
    }

    // Wake on file modifications.
    let (tx, mut rx) = tokio::sync::mpsc::channel(16);
    let mut watcher = notify::recommended_watcher(move |result: Result<NotifyEvent, _>| {
        if let Ok(event) = result {
            if matches!(event.kind, FsEventKind::Create(_) | FsEventKind::Modify(_)) {
                let _ = tx.blocking_send(());
            }
        }
    })?;
    let watch_dir = path.parent().unwrap_or(path);
    watcher.watch(watch_dir, RecursiveMode::NonRecursive)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        if let Ok(file) = std::fs::File::open(path) {
            let mut reader = BufReader::new(file);
            reader.seek(SeekFrom::Start(position))?;
            let mut line = String::new();
            while reader.read_line(&mut line)? > 0 {
                if selected(&line, services) {
                    print!("{line}");
                }
                line.clear();
            }
            position = reader.stream_position()?;
        }

        tokio::select! {
            _ = rx.recv() => {}
            _ = &mut ctrl_c => break,
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "logs_tests.rs"]
mod tests;
