//! Single-file watching
//!
//! Platforms only notify at directory granularity, so the parent directory is
//! registered and events for siblings are filtered out by name.

use crate::context::EventKind;
use crate::error::{Result, WatchError};
use crate::service::{RawEvent, WatchKey, WatchService};
use crate::strategy::WatchStrategy;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug)]
pub struct FileTarget {
    /// Absolute path of the target file
    path: PathBuf,
    parent: PathBuf,
    name: OsString,
}

impl FileTarget {
    /// Prepare a file watch: create missing parent directories and reject a
    /// directory sitting at the target path. The file itself need not exist.
    pub fn prepare(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .ok_or_else(|| {
                WatchError::Config(format!("{} does not name a file", path.display()))
            })?
            .to_os_string();

        if path.is_dir() {
            return Err(WatchError::IllegalState(format!(
                "{} is a directory, expected a file",
                path.display()
            )));
        }

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !parent.exists() {
            debug!(dir = %parent.display(), "creating missing parent directory");
            std::fs::create_dir_all(&parent).map_err(|e| WatchError::io(&parent, e))?;
        }
        let parent = parent
            .canonicalize()
            .map_err(|e| WatchError::io(&parent, e))?;

        Ok(Self {
            path: parent.join(&name),
            parent,
            name,
        })
    }

    pub fn parent(&self) -> &Path {
        &self.parent
    }
}

impl WatchStrategy for FileTarget {
    fn root(&self) -> &Path {
        &self.path
    }

    fn register(&self, service: &dyn WatchService, kinds: &[EventKind]) -> Result<()> {
        service.register(&self.parent, kinds)?;
        Ok(())
    }

    fn resolve(&self, _key: WatchKey, event: &RawEvent) -> Option<PathBuf> {
        let Some(name) = event.name.as_deref() else {
            return Some(self.path.clone());
        };

        let candidate = self.parent.join(name);
        if candidate.file_name() != Some(self.name.as_os_str()) {
            return None;
        }
        Some(candidate)
    }
}
