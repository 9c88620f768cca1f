// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fuku - local development service orchestrator
//!
//! Three modes: `run` orchestrates a profile, `logs` follows the log
//! scratch file of an active run, `stop` signals an active run's
//! processes.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod exit_error;
mod logging;
mod text;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::exit_error::ExitError;

#[derive(Parser)]
#[command(
    name = "fuku",
    version,
    about = "fuku - run your local development services as one unit"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a profile and supervise its services
    Run(commands::run::RunArgs),
    /// Follow the logs of the active session
    Logs(commands::logs::LogsArgs),
    /// Stop the active session's processes
    Stop,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        let code = error.downcast_ref::<ExitError>().map_or(1, |e| e.code);
        let message = format!("{error:#}");
        if !message.is_empty() {
            eprintln!("Error: {message}");
        }
        std::process::exit(code);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => commands::run::run(args).await,
        Commands::Logs(args) => commands::logs::logs(args).await,
        Commands::Stop => commands::stop::stop().await,
    }
}
