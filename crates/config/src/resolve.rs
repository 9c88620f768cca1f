// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Profile resolution: profile name + config → ordered startup plan.

use crate::{Config, ConfigError, ProfileSpec};
use fuku_core::{ResolvedProfile, ServiceDef, TierPlan};

pub(crate) fn resolve(config: &Config, profile: &str) -> Result<ResolvedProfile, ConfigError> {
    let spec = config
        .profiles
        .get(profile)
        .ok_or_else(|| ConfigError::UnknownProfile(profile.to_string()))?;

    let selected: Vec<&ServiceDef> = match spec {
        ProfileSpec::Star => config
            .services
            .iter()
            .filter(|service| service.profiles.includes(profile))
            .collect(),
        ProfileSpec::Services(names) => {
            // Validated at load time; keep file order rather than list order
            // so tier grouping stays deterministic.
            config
                .services
                .iter()
                .filter(|service| names.iter().any(|name| name == &service.name))
                .collect()
        }
    };

    if selected.is_empty() {
        return Err(ConfigError::EmptyProfile(profile.to_string()));
    }

    let mut tiers: Vec<TierPlan> = Vec::new();
    for service in selected {
        match tiers.iter_mut().find(|tier| tier.name == service.tier) {
            Some(tier) => tier.services.push(service.clone()),
            None => tiers.push(TierPlan {
                name: service.tier.clone(),
                services: vec![service.clone()],
            }),
        }
    }

    Ok(ResolvedProfile {
        name: profile.to_string(),
        tiers,
    })
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
