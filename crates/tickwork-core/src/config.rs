//! Scheduler configuration
//!
//! Configuration is plain data, loadable from RON:
//!
//! ```ron
//! (
//!     time_scale: 0.5,
//!     hand_off_capacity: 256,
//! )
//! ```
//!
//! Missing fields take their defaults.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings shared by the schedulers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Multiplier applied to every `dt` handed to the timer scheduler
    pub time_scale: f32,
    /// Maximum number of functions waiting in the hand-off queue (0 = unlimited)
    pub hand_off_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            hand_off_capacity: 1024,
        }
    }
}

impl SchedulerConfig {
    /// Parse a configuration from RON text
    pub fn from_ron(source: &str) -> Result<Self> {
        let config: Self = ron::from_str(source).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_ron(&source)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| Error::Config(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        if !self.time_scale.is_finite() || self.time_scale < 0.0 {
            return Err(Error::Config(format!(
                "time_scale must be a finite non-negative number, got {}",
                self.time_scale
            )));
        }
        Ok(())
    }
}
