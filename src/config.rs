//! Coordination-core configuration.
//!
//! Surfaces the magic constants `spec.md` §9 calls out as configuration —
//! batch/debounce windows, the stale-terminal TTL, and rotation defaults —
//! as a single `CoreConfig` loadable from TOML, matching the teacher's
//! `config::DaemonConfig` pattern.

use serde::{Deserialize, Serialize};

pub const DEFAULT_BATCH_WINDOW_MS: u64 = 100;
pub const DEFAULT_MAX_EVENTS_PER_BATCH: usize = 50;
pub const DEFAULT_DEBOUNCE_MS: u64 = 50;

const DEFAULT_STALE_TERMINAL_TTL_SECS: u64 = 60 * 60;
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 5 * 60;
const DEFAULT_COOLDOWN_MINUTES: i64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatcherConfig {
    pub batch_window_ms: u64,
    pub max_events_per_batch: usize,
    pub debounce_ms: u64,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            batch_window_ms: DEFAULT_BATCH_WINDOW_MS,
            max_events_per_batch: DEFAULT_MAX_EVENTS_PER_BATCH,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How long a terminal-state record survives before cleanup reaps it.
    pub stale_terminal_ttl_secs: u64,
    /// How often the background cleanup job runs.
    pub cleanup_interval_secs: u64,
    /// Capacity of the per-agent transition history ring buffer.
    pub history_capacity: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            stale_terminal_ttl_secs: DEFAULT_STALE_TERMINAL_TTL_SECS,
            cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL_SECS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountPoolConfig {
    pub cooldown_minutes_default: i64,
    pub max_retries: u32,
}

impl Default for AccountPoolConfig {
    fn default() -> Self {
        Self {
            cooldown_minutes_default: DEFAULT_COOLDOWN_MINUTES,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub batcher: BatcherConfig,
    pub lifecycle: LifecycleConfig,
    pub account_pool: AccountPoolConfig,
}

impl CoreConfig {
    /// Parse a `CoreConfig` from a TOML document. Missing sections/fields
    /// fall back to defaults (mirrors the teacher's tolerant config load).
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
