// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for the end-to-end specs.
//!
//! A [`Sandbox`] is a working directory with a `fuku.yaml`, script-backed
//! service directories, and an isolated state dir and log path. Short
//! invocations go through [`Sandbox::fuku`]; long-running ones through
//! [`Sandbox::spawn`], which streams stdout line by line so specs can
//! assert on event ordering.

#![allow(dead_code)]

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, Command as StdCommand, ExitStatus, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use assert_cmd::Command;

/// Locate the `fuku` binary built alongside this test binary.
///
/// `CARGO_BIN_EXE_fuku` is only set for binaries owned by the package under
/// test; this is a workspace-root integration test exercising a binary from
/// a sibling crate, so the path is derived from the test executable's own
/// location instead.
fn fuku_bin_path() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("fuku");
    path
}

pub struct Sandbox {
    pub dir: tempfile::TempDir,
    pub state: tempfile::TempDir,
    pub log_path: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();
        let log_path = state.path().join("fuku.log");
        Self {
            dir,
            state,
            log_path,
        }
    }

    pub fn config(&self, yaml: &str) {
        std::fs::write(self.dir.path().join("fuku.yaml"), yaml).unwrap();
    }

    /// Create a service directory with a `run.sh` (invoked as `sh run.sh`).
    pub fn service(&self, name: &str, script: &str) {
        let dir = self.dir.path().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("run.sh"), script).unwrap();
    }

    /// Write a file relative to the sandbox root.
    pub fn touch(&self, relative: &str, content: &str) {
        std::fs::write(self.dir.path().join(relative), content).unwrap();
    }

    pub fn session_path(&self) -> PathBuf {
        self.state.path().join("session.json")
    }

    /// Short `fuku` invocation with the sandbox environment.
    pub fn fuku(&self) -> Command {
        let mut cmd = Command::new(fuku_bin_path());
        cmd.current_dir(self.dir.path())
            .env("FUKU_STATE_DIR", self.state.path())
            .env("FUKU_LOG_PATH", &self.log_path)
            .env_remove("FUKU_CONFIG")
            .timeout(Duration::from_secs(60));
        cmd
    }

    /// Long-running `fuku` invocation with line-streamed stdout.
    pub fn spawn(&self, args: &[&str]) -> Session {
        let mut child = StdCommand::new(fuku_bin_path())
            .args(args)
            .current_dir(self.dir.path())
            .env("FUKU_STATE_DIR", self.state.path())
            .env("FUKU_LOG_PATH", &self.log_path)
            .env_remove("FUKU_CONFIG")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();

        let stdout = child.stdout.take().unwrap();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        Session {
            child,
            rx,
            lines: Vec::new(),
        }
    }
}

pub struct Session {
    child: Child,
    rx: mpsc::Receiver<String>,
    pub lines: Vec<String>,
}

impl Session {
    /// Block until a line containing `needle` has been seen.
    pub fn wait_for(&mut self, needle: &str, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        loop {
            if self.lines.iter().any(|line| line.contains(needle)) {
                return;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.dump_and_panic(needle);
            }
            match self.rx.recv_timeout(remaining) {
                Ok(line) => self.lines.push(line),
                Err(_) => self.dump_and_panic(needle),
            }
        }
    }

    /// Block until at least `count` lines containing `needle` have been
    /// seen.
    pub fn wait_for_count(&mut self, needle: &str, count: usize, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        loop {
            if self.count_of(needle) >= count {
                return;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.dump_and_panic(needle);
            }
            match self.rx.recv_timeout(remaining) {
                Ok(line) => self.lines.push(line),
                Err(_) => self.dump_and_panic(needle),
            }
        }
    }

    /// Index of the first seen line containing `needle`.
    pub fn index_of(&self, needle: &str) -> usize {
        match self.lines.iter().position(|line| line.contains(needle)) {
            Some(index) => index,
            None => panic!("no line contains {needle:?}; seen:\n{}", self.lines.join("\n")),
        }
    }

    pub fn count_of(&self, needle: &str) -> usize {
        self.lines
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }

    pub fn sigterm(&self) {
        let _ = nix::sys::signal::kill(
            nix::unistd::Pid::from_raw(self.child.id() as i32),
            nix::sys::signal::Signal::SIGTERM,
        );
    }

    pub fn sigint(&self) {
        let _ = nix::sys::signal::kill(
            nix::unistd::Pid::from_raw(self.child.id() as i32),
            nix::sys::signal::Signal::SIGINT,
        );
    }

    /// Wait for exit and drain any remaining output lines.
    pub fn wait_exit(&mut self, timeout: Duration) -> ExitStatus {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.child.try_wait().unwrap() {
                while let Ok(line) = self.rx.recv_timeout(Duration::from_secs(1)) {
                    self.lines.push(line);
                }
                return status;
            }
            if Instant::now() >= deadline {
                self.dump_and_panic("process exit");
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    }

    fn dump_and_panic(&mut self, waiting_for: &str) -> ! {
        while let Ok(line) = self.rx.try_recv() {
            self.lines.push(line);
        }
        let _ = self.child.kill();
        panic!(
            "timed out waiting for {waiting_for:?}; output so far:\n{}",
            self.lines.join("\n")
        );
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
