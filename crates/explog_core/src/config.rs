//! Ledger policy configuration.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Minimum seconds between two `add_step` calls on one experiment.
pub const DEFAULT_STEP_COOLDOWN_SECS: u64 = 60;

/// Events a ledger buffers before the oldest are discarded.
pub const DEFAULT_MAX_BUFFERED_EVENTS: usize = 4096;

/// Tunable ledger policy.
///
/// A zero cooldown disables the rate-limit gate. A zero event buffer keeps
/// no events at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    pub step_cooldown_secs: u64,
    pub max_buffered_events: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            step_cooldown_secs: DEFAULT_STEP_COOLDOWN_SECS,
            max_buffered_events: DEFAULT_MAX_BUFFERED_EVENTS,
        }
    }
}

impl LedgerConfig {
    pub fn with_step_cooldown_secs(mut self, secs: u64) -> Self {
        self.step_cooldown_secs = secs;
        self
    }

    pub fn with_max_buffered_events(mut self, max: usize) -> Self {
        self.max_buffered_events = max;
        self
    }

    /// Parses a JSON config document; absent fields keep their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(ConfigError::Parse)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid ledger config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
        }
    }
}
