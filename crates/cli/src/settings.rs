//! Settings resolution: file first, then command-line overrides

use crate::Cli;
use anyhow::{Context, Result};
use pathwatch::WatchSettings;
use std::path::{Path, PathBuf};

/// Default settings location: `<config dir>/pathwatch/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pathwatch").join("config.toml"))
}

/// Load settings for this invocation.
///
/// An explicit `--config` must exist; the default location may be absent.
pub fn resolve(cli: &Cli) -> Result<WatchSettings> {
    let mut settings = load(cli.config.as_deref(), default_config_path().as_deref())?;
    if let Some(delay_ms) = cli.delay_ms {
        settings.delay_ms = delay_ms;
    }
    Ok(settings)
}

fn load(explicit: Option<&Path>, fallback: Option<&Path>) -> Result<WatchSettings> {
    match (explicit, fallback) {
        (Some(path), _) => WatchSettings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        (None, Some(path)) => WatchSettings::load_or_default(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        (None, None) => Ok(WatchSettings::default()),
    }
}
