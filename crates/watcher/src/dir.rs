//! Recursive directory watching bounded by depth
//!
//! Every directory down to `max_depth` gets its own registration. New
//! subdirectories are registered while their create event is being handled,
//! before it is dispatched, so files written into them right away are seen.

use crate::context::EventKind;
use crate::error::{Result, WatchError};
use crate::service::{RawEvent, WatchKey, WatchService};
use crate::strategy::WatchStrategy;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A registered directory and its distance from the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub dir: PathBuf,
    pub depth: usize,
}

#[derive(Debug)]
pub struct DirTree {
    root: PathBuf,
    max_depth: usize,
    nodes: DashMap<WatchKey, Node>,
}

const REQUIRED: [EventKind; 1] = [EventKind::Create];

impl DirTree {
    /// Prepare a directory watch, creating the root if it is missing.
    ///
    /// `max_depth` 0 watches only the root's own entries.
    pub fn prepare(path: &Path, max_depth: usize) -> Result<Self> {
        if path.exists() {
            if !path.is_dir() {
                return Err(WatchError::IllegalState(format!(
                    "{} is not a directory",
                    path.display()
                )));
            }
        } else {
            debug!(dir = %path.display(), "creating missing watch root");
            std::fs::create_dir_all(path).map_err(|e| WatchError::io(path, e))?;
        }

        let root = path.canonicalize().map_err(|e| WatchError::io(path, e))?;
        Ok(Self {
            root,
            max_depth,
            nodes: DashMap::new(),
        })
    }

    /// Registered directories, sorted by path
    pub fn nodes(&self) -> Vec<Node> {
        let mut nodes: Vec<Node> = self.nodes.iter().map(|n| n.value().clone()).collect();
        nodes.sort_by(|a, b| a.dir.cmp(&b.dir));
        nodes
    }

    /// Register `start` (at `start_depth`) and every directory below it
    /// within bounds. Unreadable entries are skipped. Returns the newly
    /// registered directories in walk order.
    fn register_tree(
        &self,
        service: &dyn WatchService,
        start: &Path,
        start_depth: usize,
        kinds: &[EventKind],
    ) -> Result<Vec<PathBuf>> {
        if start_depth > self.max_depth {
            return Ok(Vec::new());
        }

        let mut registered = Vec::new();
        let walker = WalkDir::new(start)
            .follow_links(false)
            .max_depth(self.max_depth - start_depth)
            .into_iter()
            .filter_entry(|e| e.file_type().is_dir());

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(root = %self.root.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };

            let depth = start_depth + entry.depth();
            let key = service.register(entry.path(), kinds)?;
            self.nodes.insert(
                key,
                Node {
                    dir: entry.path().to_path_buf(),
                    depth,
                },
            );
            registered.push(entry.into_path());
        }

        Ok(registered)
    }

    /// Entries already present in freshly registered directories, parents
    /// before children
    fn existing_entries(&self, dirs: &[PathBuf]) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for dir in dirs {
            let entries = match std::fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "cannot list new directory");
                    continue;
                }
            };
            let mut children: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
            children.sort();
            found.extend(children);
        }
        found
    }
}

impl WatchStrategy for DirTree {
    fn root(&self) -> &Path {
        &self.root
    }

    fn register(&self, service: &dyn WatchService, kinds: &[EventKind]) -> Result<()> {
        let registered = self.register_tree(service, &self.root, 0, kinds)?;
        debug!(
            root = %self.root.display(),
            dirs = registered.len(),
            max_depth = self.max_depth,
            "registered directory tree"
        );
        Ok(())
    }

    fn resolve(&self, key: WatchKey, event: &RawEvent) -> Option<PathBuf> {
        let node = self.nodes.get(&key)?;
        match event.name.as_deref() {
            Some(name) => Some(node.dir.join(name)),
            None => Some(node.dir.clone()),
        }
    }

    fn on_created(
        &self,
        service: &dyn WatchService,
        key: WatchKey,
        path: &Path,
        kinds: &[EventKind],
    ) -> Result<Vec<PathBuf>> {
        if !path.is_dir() {
            return Ok(Vec::new());
        }
        let Some(parent_depth) = self.nodes.get(&key).map(|n| n.depth) else {
            return Ok(Vec::new());
        };

        let depth = parent_depth + 1;
        if depth > self.max_depth {
            return Ok(Vec::new());
        }

        // Register first, then list: an entry created in between may be
        // reported twice, but never missed
        let registered = self.register_tree(service, path, depth, kinds)?;
        debug!(dir = %path.display(), depth, dirs = registered.len(), "registered new subdirectory");
        Ok(self.existing_entries(&registered))
    }

    fn required_kinds(&self) -> &[EventKind] {
        &REQUIRED
    }
}
