//! Error types for path watching

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to the caller at construction or lifecycle time.
///
/// Anything that goes wrong inside a running watch loop is logged there and
/// never reaches this type.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Invalid watcher configuration: {0}")]
    Config(String),

    #[error("Illegal watcher state: {0}")]
    IllegalState(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Notification backend error: {0}")]
    Notify(#[from] notify::Error),

    #[error("Watch service is closed")]
    Closed,

    #[error("Scheduler has been shut down")]
    SchedulerShutdown,

    #[error("Failed to parse settings: {0}")]
    Settings(#[from] toml::de::Error),
}

impl WatchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WatchError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for watch operations
pub type Result<T> = std::result::Result<T, WatchError>;
