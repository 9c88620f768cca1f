// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fuku.yaml` loading, validation, and profile resolution.
//!
//! The raw file schema lives in [`raw`]; this module converts it into the
//! typed definitions from `fuku-core` and resolves profile names into
//! ordered startup plans.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod error;
mod raw;
mod resolve;

pub use error::ConfigError;
pub use raw::SUPPORTED_VERSION;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fuku_core::{
    ProfileSelector, Readiness, ResolvedProfile, RetryPolicy, ServiceDef, WatchSpec,
    DEFAULT_READINESS_TIMEOUT, DEFAULT_WATCH_DEBOUNCE,
};
use indexmap::IndexMap;

use raw::{
    ConfigFile, RawProfile, RawReadiness, RawReadinessKind, RawService, RawServiceProfiles,
    RawWatch,
};

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = "fuku.yaml";

/// How a `profiles:` entry selects services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSpec {
    /// `"*"`: every service whose own `profiles` field admits this profile.
    Star,
    /// An explicit service list.
    Services(Vec<String>),
}

/// Log output settings from the `logging:` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logging {
    /// `text` or `json`.
    pub format: String,
    /// tracing filter directive, e.g. `info` or `fuku=debug`.
    pub level: String,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            level: "info".to_string(),
        }
    }
}

/// A validated configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Services in file order; order determines tier discovery order.
    pub services: Vec<ServiceDef>,
    pub profiles: IndexMap<String, ProfileSpec>,
    pub default_profiles: Vec<String>,
    pub logging: Logging,
}

impl Config {
    /// Load and validate the config file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse and validate config text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_yaml::from_str(text)?;
        Self::from_file(file)
    }

    fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        if file.version != raw::SUPPORTED_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: file.version,
                expected: raw::SUPPORTED_VERSION,
            });
        }

        let mut services = Vec::with_capacity(file.services.len());
        for (name, service) in &file.services {
            services.push(convert_service(name, service)?);
        }

        let mut profiles = IndexMap::with_capacity(file.profiles.len());
        for (name, profile) in &file.profiles {
            let spec = match profile {
                RawProfile::Star(star) if star == "*" => ProfileSpec::Star,
                RawProfile::Star(other) => {
                    return Err(ConfigError::InvalidProfile {
                        profile: name.clone(),
                        reason: format!("expected \"*\" or a service list, got \"{other}\""),
                    });
                }
                RawProfile::List(names) => {
                    for service in names {
                        if !file.services.contains_key(service) {
                            return Err(ConfigError::UnknownService {
                                profile: name.clone(),
                                service: service.clone(),
                            });
                        }
                    }
                    ProfileSpec::Services(names.clone())
                }
            };
            profiles.insert(name.clone(), spec);
        }

        let default_profiles = file
            .defaults
            .map(|defaults| defaults.profiles)
            .unwrap_or_default();
        for profile in &default_profiles {
            if !profiles.contains_key(profile) {
                return Err(ConfigError::UnknownProfile(profile.clone()));
            }
        }

        let logging = match file.logging {
            Some(logging) => Logging {
                format: logging.format.unwrap_or_else(|| "text".to_string()),
                level: logging.level.unwrap_or_else(|| "info".to_string()),
            },
            None => Logging::default(),
        };

        Ok(Self {
            services,
            profiles,
            default_profiles,
            logging,
        })
    }

    /// The profile used when `run` is invoked without an argument.
    pub fn default_profile(&self) -> Result<&str, ConfigError> {
        self.default_profiles
            .first()
            .map(String::as_str)
            .ok_or(ConfigError::NoDefaultProfile)
    }

    /// Resolve a profile name into an ordered startup plan.
    ///
    /// Tier order is the order tiers first appear among the selected
    /// services, which in turn follow file order.
    pub fn resolve(&self, profile: &str) -> Result<ResolvedProfile, ConfigError> {
        resolve::resolve(self, profile)
    }

    pub fn service(&self, name: &str) -> Option<&ServiceDef> {
        self.services.iter().find(|service| service.name == name)
    }
}

fn convert_service(name: &str, raw: &RawService) -> Result<ServiceDef, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidService {
        service: name.to_string(),
        reason,
    };

    let readiness = match &raw.readiness {
        None => Readiness::None,
        Some(readiness) => convert_readiness(name, readiness)?,
    };

    let watch = match &raw.watch {
        None => None,
        Some(RawWatch::Globs(globs)) => Some(WatchSpec::new(globs.clone())),
        Some(RawWatch::Detailed {
            patterns,
            debounce_ms,
        }) => Some(WatchSpec {
            globs: patterns.clone(),
            debounce: debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_WATCH_DEBOUNCE),
        }),
    };

    let profiles = match &raw.profiles {
        None => ProfileSelector::All,
        Some(RawServiceProfiles::Keyword(word)) if word == "all" => ProfileSelector::All,
        Some(RawServiceProfiles::Keyword(word)) => {
            return Err(invalid(format!(
                "profiles must be \"all\" or a list, got \"{word}\""
            )));
        }
        Some(RawServiceProfiles::List(names)) => {
            ProfileSelector::Named(names.iter().cloned().collect::<BTreeSet<_>>())
        }
    };

    let command = match &raw.command {
        None => None,
        Some(command) => {
            let argv: Vec<String> = command.split_whitespace().map(str::to_string).collect();
            if argv.is_empty() {
                return Err(invalid("command must not be empty".to_string()));
            }
            Some(argv)
        }
    };

    let defaults = RetryPolicy::default();
    let retry = match &raw.retry {
        None => defaults,
        Some(retry) => RetryPolicy {
            max_attempts: retry.max_attempts.unwrap_or(defaults.max_attempts),
            base_delay: retry
                .base_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_delay),
            max_delay: retry
                .max_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_delay),
        },
    };

    Ok(ServiceDef {
        name: name.to_string(),
        dir: raw.dir.clone(),
        tier: raw.tier.clone(),
        profiles,
        readiness,
        watch,
        retry,
        command,
    })
}

fn convert_readiness(service: &str, raw: &RawReadiness) -> Result<Readiness, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidService {
        service: service.to_string(),
        reason: reason.to_string(),
    };
    let timeout = raw
        .timeout
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_READINESS_TIMEOUT);

    match raw.kind {
        RawReadinessKind::None => Ok(Readiness::None),
        RawReadinessKind::Log => {
            let pattern = raw
                .pattern
                .clone()
                .ok_or_else(|| invalid("log readiness requires a pattern"))?;
            Ok(Readiness::Log { pattern, timeout })
        }
        RawReadinessKind::Http => {
            let url = raw
                .url
                .clone()
                .ok_or_else(|| invalid("http readiness requires a url"))?;
            Ok(Readiness::Http { url, timeout })
        }
    }
}

/// Resolve the config path: `$FUKU_CONFIG` override or `fuku.yaml` in `dir`.
pub fn config_path(dir: &Path) -> PathBuf {
    match std::env::var("FUKU_CONFIG") {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => dir.join(CONFIG_FILE_NAME),
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
