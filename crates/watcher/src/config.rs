//! Watch settings loadable from TOML
//!
//! ```toml
//! delay_ms = 200          # 0 disables debouncing
//! max_depth = 3
//! poll_interval_ms = 500  # only used by the polling backend
//! compare_contents = false
//! ```

use crate::error::{Result, WatchError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchSettings {
    /// Debounce window for modify events in milliseconds
    pub delay_ms: u64,

    /// Recursion bound for directory watches
    pub max_depth: usize,

    /// Poll interval for backends that poll
    pub poll_interval_ms: Option<u64>,

    /// Compare file contents when polling
    pub compare_contents: bool,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            delay_ms: crate::DEFAULT_DELAY.as_millis() as u64,
            max_depth: 0,
            poll_interval_ms: None,
            compare_contents: false,
        }
    }
}

impl WatchSettings {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let settings: Self = toml::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| WatchError::io(path, e))?;
        Self::from_toml_str(&contents)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == Some(0) {
            return Err(WatchError::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Backend options derived from these settings
    pub fn notify_config(&self) -> notify::Config {
        let mut config = notify::Config::default().with_compare_contents(self.compare_contents);
        if let Some(ms) = self.poll_interval_ms {
            config = config.with_poll_interval(Duration::from_millis(ms));
        }
        config
    }
}
