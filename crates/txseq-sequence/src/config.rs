use serde::{Deserialize, Serialize};

use crate::error::{Result, SequenceError};

/// Configuration for a [`SequenceManager`](crate::SequenceManager).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Number of slots in the sequence space (the in-flight window).
    pub capacity: usize,
    /// Largest number of missing ids a single slot reports at once. Wider
    /// gaps are listed lowest first, the rest once those are confirmed.
    pub max_gap: u64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            max_gap: 1 << 20,
        }
    }
}

impl SequenceConfig {
    /// Parse a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SequenceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configured values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 || self.capacity > u32::MAX as usize {
            return Err(SequenceError::InvalidCapacity(self.capacity));
        }
        if self.max_gap == 0 {
            return Err(SequenceError::Config("max_gap must be at least 1".into()));
        }
        Ok(())
    }
}
