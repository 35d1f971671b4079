//! What differs between watching one file and watching a tree

use crate::context::EventKind;
use crate::error::Result;
use crate::service::{RawEvent, WatchKey, WatchService};
use std::path::{Path, PathBuf};

/// Registration and resolution rules plugged into [`crate::PathWatcher`]
pub trait WatchStrategy: Send + Sync {
    /// The watched file or directory
    fn root(&self) -> &Path;

    /// Subscribe whatever directories the root needs
    fn register(&self, service: &dyn WatchService, kinds: &[EventKind]) -> Result<()>;

    /// Map a raw event to the concrete affected path, or `None` when the
    /// event does not concern this watch
    fn resolve(&self, key: WatchKey, event: &RawEvent) -> Option<PathBuf>;

    /// Called for every resolved create event before it is dispatched.
    ///
    /// Returns entries found inside `path` that no event will report because
    /// they appeared before `path` was registered.
    fn on_created(
        &self,
        _service: &dyn WatchService,
        _key: WatchKey,
        _path: &Path,
        _kinds: &[EventKind],
    ) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }

    /// Kinds this strategy needs delivered even without a callback
    fn required_kinds(&self) -> &[EventKind] {
        &[]
    }
}
