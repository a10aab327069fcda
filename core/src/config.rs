//! Engine configuration.
//!
//! All tunables are named config fields, never inline constants. In
//! particular the recalculation interval is **90 seconds** — the interval
//! the production service actually ran at (old UI copy advertised
//! "every 5 minutes"; that figure was stale and is not honored here).

use crate::error::EngineResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds between scheduled recalculation passes.
    pub interval_secs: u64,
    /// Minimum progress-percentage drift (in percentage points) that
    /// triggers a persistence write.
    pub percentage_epsilon: f64,
    /// Minimum current-value drift (in currency units) that triggers a
    /// persistence write.
    pub value_epsilon: f64,
    /// Safety ceiling applied to percentages before persistence, so a
    /// tiny target can't produce a runaway display value.
    pub percentage_cap: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval_secs: 90,
            percentage_epsilon: 0.1,
            value_epsilon: 1.0,
            percentage_cap: 999.0,
        }
    }
}

impl EngineConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Load config from a JSON file. Missing fields fall back to defaults.
    pub fn from_file(path: &str) -> EngineResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
