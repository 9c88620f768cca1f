// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk schema of `fuku.yaml`.
//!
//! These types mirror the file exactly; validation and conversion into the
//! typed [`fuku_core`] definitions happen in [`crate::Config`]. Every map is
//! insertion-ordered so that tier discovery order is the order services
//! appear in the file. Unknown keys are a hard error at every level.

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::PathBuf;

/// Supported config file version.
pub const SUPPORTED_VERSION: u32 = 1;

fn default_tier() -> String {
    "default".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub version: u32,
    #[serde(default)]
    pub services: IndexMap<String, RawService>,
    #[serde(default)]
    pub profiles: IndexMap<String, RawProfile>,
    pub defaults: Option<RawDefaults>,
    pub logging: Option<RawLogging>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawService {
    pub dir: PathBuf,
    #[serde(default = "default_tier")]
    pub tier: String,
    pub readiness: Option<RawReadiness>,
    pub watch: Option<RawWatch>,
    pub profiles: Option<RawServiceProfiles>,
    /// Whitespace-split override of `make run`.
    pub command: Option<String>,
    pub retry: Option<RawRetry>,
}

/// `profiles: all` or `profiles: [dev, full]` on a service.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawServiceProfiles {
    List(Vec<String>),
    Keyword(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawReadinessKind {
    None,
    Log,
    Http,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawReadiness {
    #[serde(rename = "type")]
    pub kind: RawReadinessKind,
    pub pattern: Option<String>,
    pub url: Option<String>,
    /// Seconds.
    pub timeout: Option<u64>,
}

/// `watch: ["**/*.go"]` or the expanded form with a debounce override.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawWatch {
    Globs(Vec<String>),
    Detailed {
        #[serde(default)]
        patterns: Vec<String>,
        debounce_ms: Option<u64>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRetry {
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

/// `profiles:` entry: `"*"` selects every participating service, a list
/// names services explicitly.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawProfile {
    List(Vec<String>),
    Star(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDefaults {
    #[serde(default)]
    pub profiles: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawLogging {
    pub format: Option<String>,
    pub level: Option<String>,
}

#[cfg(test)]
#[path = "raw_tests.rs"]
mod tests;
