//! Hub-wide configuration (spec §10.3 — implementation-defined knobs the
//! core specification leaves to the deployment).
//!
//! Loaded from TOML the same way the teacher's layered `Config` is: a
//! `#[derive(Deserialize, Default)]` tree with `#[serde(default)]` on every
//! section, so a partial or empty file still produces a usable config.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HubConfig {
    pub buffer: BufferConfig,
    pub limits: LimitsConfig,
    pub observability: ObservabilityConfig,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            buffer: BufferConfig::default(),
            limits: LimitsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl HubConfig {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Observation buffer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Defaults for observations that don't set an explicit capacity
/// (spec §4.6: "capacity configured per-observation (default
/// implementation-defined, e.g. 0 = no buffering)").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BufferConfig {
    pub default_observation_capacity: usize,
    /// Whether `get_{min,max,mean,stddev}` compute the real statistic
    /// (spec §9 Open Question, resolved in SPEC_FULL.md §10.1: default on).
    /// Turning this off restores the source's silent-NaN stub without
    /// touching call sites.
    pub aggregates_enabled: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            default_observation_capacity: 16,
            aggregates_enabled: true,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tree limits
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Caps whose violation produces the `no-memory` wire error (spec §6.2).
/// `None` means unbounded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_entries: Option<usize>,
    pub max_handlers_per_resource: Option<usize>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Observability
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How verbosely `HubEvent`s are logged. The hub never ships its own OTel
/// exporter (telemetry publishing is an external collaborator per spec
/// §1) — this only controls the `tracing` level used for `emit()`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_pushes: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_pushes: false }
    }
}
