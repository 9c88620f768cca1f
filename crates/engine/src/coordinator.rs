// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tier coordinator: sequential tiers, concurrent services.
//!
//! Each tier's services are started in parallel; the next tier starts only
//! after every service in the current tier is `Running`. A terminal failure
//! anywhere in a tier publishes `tier_failed` and aborts the remaining
//! tiers without touching services that are already running — the
//! orchestrator decides what happens next.

use std::collections::HashMap;

use fuku_core::{EventKind, ResolvedProfile};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bus::EventBus;
use crate::supervisor::{Settled, SupervisorHandle};

/// How startup coordination ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOutcome {
    /// Every tier reached `tier_ready`.
    AllReady,
    /// A tier had terminally failed services; later tiers never started.
    TierFailed { tier: String },
    /// Startup was cancelled (signal or stop request).
    Cancelled,
}

/// Start all tiers of `profile` in order.
pub async fn run_tiers(
    profile: &ResolvedProfile,
    supervisors: &HashMap<String, SupervisorHandle>,
    bus: &EventBus,
    cancel: &CancellationToken,
) -> TierOutcome {
    let total = profile.tiers.len();

    for (position, tier) in profile.tiers.iter().enumerate() {
        if cancel.is_cancelled() {
            return TierOutcome::Cancelled;
        }

        info!(tier = %tier.name, index = position + 1, total, "starting tier");
        bus.publish(EventKind::TierStarting {
            tier: tier.name.clone(),
            index: position + 1,
            total,
        })
        .await;

        // Kick off every service in the tier before waiting on any.
        for service in &tier.services {
            if let Some(handle) = supervisors.get(&service.name) {
                handle.start().await;
            }
        }

        let mut failed = Vec::new();
        let mut cancelled = false;
        for service in &tier.services {
            let Some(handle) = supervisors.get(&service.name) else {
                continue;
            };
            match handle.wait_settled(cancel).await {
                Settled::Running => {}
                Settled::Failed => failed.push(service.name.clone()),
                Settled::Stopped => cancelled = true,
            }
        }

        if cancelled || cancel.is_cancelled() {
            return TierOutcome::Cancelled;
        }

        if !failed.is_empty() {
            warn!(tier = %tier.name, failed = ?failed, "tier failed");
            bus.publish(EventKind::TierFailed {
                tier: tier.name.clone(),
                failed,
                total: tier.services.len(),
            })
            .await;
            return TierOutcome::TierFailed {
                tier: tier.name.clone(),
            };
        }

        bus.publish(EventKind::TierReady {
            tier: tier.name.clone(),
        })
        .await;
    }

    TierOutcome::AllReady
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
