//! Event kinds and the context handed to callbacks

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Type of file system change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Entry created (or renamed into the watched directory)
    Create,
    /// Entry contents or metadata changed
    Modify,
    /// Entry deleted (or renamed out of the watched directory)
    Delete,
    /// Events were lost; the watched directory should be rescanned
    Overflow,
}

impl EventKind {
    /// All kinds, in dispatch-table order
    pub const ALL: [EventKind; 4] = [
        EventKind::Create,
        EventKind::Modify,
        EventKind::Delete,
        EventKind::Overflow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Create => "create",
            EventKind::Modify => "modify",
            EventKind::Delete => "delete",
            EventKind::Overflow => "overflow",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(EventKind::Create),
            "modify" => Ok(EventKind::Modify),
            "delete" => Ok(EventKind::Delete),
            "overflow" => Ok(EventKind::Overflow),
            other => Err(format!("unknown event kind '{other}'")),
        }
    }
}

/// One observed change, as delivered to a callback
///
/// Immutable once built. `is_dir` is sampled when the event is resolved, so a
/// deleted directory reports `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchEventContext {
    kind: EventKind,
    path: PathBuf,
    is_dir: bool,
}

impl WatchEventContext {
    pub fn new(kind: EventKind, path: PathBuf, is_dir: bool) -> Self {
        Self { kind, path, is_dir }
    }

    /// Build a context for `path`, probing the file system for its type
    pub(crate) fn observe(kind: EventKind, path: PathBuf) -> Self {
        let is_dir = path.is_dir();
        Self::new(kind, path, is_dir)
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }
}
