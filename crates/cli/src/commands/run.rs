// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fuku run`: orchestrate a profile.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use fuku_config::{config_path, Config};
use fuku_engine::{
    env, AllowAll, CommandBus, EventBus, Orchestrator, OrchestratorOptions, RunOutcome,
    SessionRegistry,
};

use crate::exit_error::ExitError;
use crate::text;

#[derive(Args)]
pub struct RunArgs {
    /// Profile to start; defaults to the configured default profile
    pub profile: Option<String>,

    /// Print events as single-line text records instead of the UI
    #[arg(long)]
    pub no_ui: bool,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let config = Config::load(&config_path(&cwd))?;
    crate::logging::init(&config.logging);

    let profile_name = match &args.profile {
        Some(name) => name.clone(),
        None => config.default_profile()?.to_string(),
    };
    let profile = config.resolve(&profile_name)?;

    let bus = EventBus::new();
    let commands = CommandBus::new();
    let registry = SessionRegistry::new(&env::state_dir()?);

    // The interactive UI ships separately; both modes currently use the
    // text recorder on stdout.
    if !args.no_ui {
        tracing::info!("interactive UI not bundled in this build, printing text records");
    }
    let mut events = bus.subscribe();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{}", text::render(&event));
        }
    });

    let orchestrator = Orchestrator::new(
        profile,
        bus,
        commands,
        registry,
        OrchestratorOptions {
            log_path: env::log_path(),
            log_filter: Arc::new(AllowAll),
            handle_signals: true,
            ..OrchestratorOptions::default()
        },
    );

    let outcome = orchestrator.run().await?;
    let _ = printer.await;

    match outcome {
        RunOutcome::Clean => Ok(()),
        RunOutcome::TierFailure => Err(ExitError::silent(1).into()),
        RunOutcome::Interrupted => Err(ExitError::silent(130).into()),
    }
}
