//! Blocking watch service over the platform notification API
//!
//! A [`WatchService`] hands out one [`WatchKey`] per registered directory and
//! delivers changes as [`WatchBatch`]es through a blocking `take()`. Closing the
//! service wakes a blocked `take()` with [`TakeError::Closed`].

use crate::context::EventKind;
use crate::error::{Result, WatchError};
use crossbeam_channel::{unbounded, Receiver, Sender};
use dashmap::DashMap;
use notify::event::{ModifyKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

/// Handle of one directory registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchKey(u64);

impl WatchKey {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// One change as reported for a registered directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: EventKind,
    /// Entry name relative to the registered directory, `None` for overflow
    pub name: Option<PathBuf>,
}

impl RawEvent {
    pub fn new(kind: EventKind, name: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            name: Some(name.into()),
        }
    }

    pub fn overflow() -> Self {
        Self {
            kind: EventKind::Overflow,
            name: None,
        }
    }

    /// Name used to coalesce modify bursts
    pub fn debounce_key(&self) -> String {
        self.name
            .as_deref()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Events taken from the service in one call, all for the same registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchBatch {
    pub key: WatchKey,
    pub events: Vec<RawEvent>,
}

/// Why `take()` returned without a batch
#[derive(Error, Debug)]
pub enum TakeError {
    #[error("watch service closed")]
    Closed,

    #[error("notification backend error: {0}")]
    Backend(#[from] notify::Error),
}

/// The primitive the watch loop blocks on
pub trait WatchService: Send + Sync {
    /// Subscribe `dir` (non-recursively) to the given event kinds.
    ///
    /// Overflow is always delivered. Registering an already registered
    /// directory updates its kinds and returns the existing key.
    fn register(&self, dir: &Path, kinds: &[EventKind]) -> Result<WatchKey>;

    /// Block until the next batch is available or the service is closed
    fn take(&self) -> std::result::Result<WatchBatch, TakeError>;

    /// Acknowledge a processed batch. Returns `false` once the key is no
    /// longer valid (service closed or directory gone).
    fn reset(&self, key: WatchKey) -> bool;

    /// Release the underlying handle. Idempotent.
    fn close(&self) -> Result<()>;
}

enum Signal {
    Batch(WatchBatch),
    Error(notify::Error),
    Closed,
}

struct Registration {
    key: WatchKey,
    kinds: Vec<EventKind>,
}

/// Directory <-> key bookkeeping shared with the notify callback thread
#[derive(Default)]
struct Registry {
    by_dir: DashMap<PathBuf, Registration>,
    by_key: DashMap<WatchKey, PathBuf>,
    next_key: AtomicU64,
}

impl Registry {
    fn key_for_dir(&self, dir: &Path) -> Option<WatchKey> {
        self.by_dir.get(dir).map(|r| r.key)
    }

    fn first_key(&self) -> Option<WatchKey> {
        self.by_key.iter().map(|e| *e.key()).min()
    }

    /// Split a notify event into per-registration batches
    fn translate(&self, event: notify::Event) -> Vec<WatchBatch> {
        if event.need_rescan() {
            let key = event
                .paths
                .first()
                .and_then(|p| {
                    self.key_for_dir(p)
                        .or_else(|| p.parent().and_then(|parent| self.key_for_dir(parent)))
                })
                .or_else(|| self.first_key());
            return key
                .map(|key| {
                    vec![WatchBatch {
                        key,
                        events: vec![RawEvent::overflow()],
                    }]
                })
                .unwrap_or_default();
        }

        let changes: Vec<(EventKind, &PathBuf)> = match event.kind {
            notify::EventKind::Create(_) => {
                event.paths.iter().map(|p| (EventKind::Create, p)).collect()
            }
            notify::EventKind::Remove(_) => {
                event.paths.iter().map(|p| (EventKind::Delete, p)).collect()
            }
            notify::EventKind::Modify(ModifyKind::Name(mode)) => match mode {
                RenameMode::From => event.paths.iter().map(|p| (EventKind::Delete, p)).collect(),
                RenameMode::To => event.paths.iter().map(|p| (EventKind::Create, p)).collect(),
                RenameMode::Both => event
                    .paths
                    .iter()
                    .enumerate()
                    .map(|(i, p)| {
                        let kind = if i == 0 { EventKind::Delete } else { EventKind::Create };
                        (kind, p)
                    })
                    .collect(),
                // Backends that cannot tell which side of the rename this is
                _ => event
                    .paths
                    .iter()
                    .map(|p| {
                        let kind = if p.exists() { EventKind::Create } else { EventKind::Delete };
                        (kind, p)
                    })
                    .collect(),
            },
            notify::EventKind::Modify(_) => {
                event.paths.iter().map(|p| (EventKind::Modify, p)).collect()
            }
            _ => return Vec::new(),
        };

        let mut batches: Vec<WatchBatch> = Vec::new();
        for (kind, path) in changes {
            let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
                continue;
            };
            let Some(reg) = self.by_dir.get(parent) else {
                trace!(path = %path.display(), "event outside registered directories");
                continue;
            };
            if !reg.kinds.contains(&kind) {
                continue;
            }

            let raw = RawEvent::new(kind, name);
            match batches.last_mut() {
                Some(last) if last.key == reg.key => last.events.push(raw),
                _ => batches.push(WatchBatch {
                    key: reg.key,
                    events: vec![raw],
                }),
            }
        }
        batches
    }

    fn clear(&self) {
        self.by_dir.clear();
        self.by_key.clear();
    }
}

/// [`WatchService`] backed by `notify::RecommendedWatcher`
///
/// Each directory is watched non-recursively; recursion is the directory
/// strategy's job so depth limits can be honored.
pub struct NotifyWatchService {
    watcher: Mutex<Option<RecommendedWatcher>>,
    registry: Arc<Registry>,
    tx: Sender<Signal>,
    rx: Receiver<Signal>,
    closed: AtomicBool,
}

impl NotifyWatchService {
    /// Create the backend handle. `config` is passed through to notify
    /// uninterpreted (poll interval, content comparison).
    pub fn new(config: notify::Config) -> Result<Self> {
        let (tx, rx) = unbounded();
        let registry = Arc::new(Registry::default());

        let handler_registry = Arc::clone(&registry);
        let handler_tx = tx.clone();
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    for batch in handler_registry.translate(event) {
                        let _ = handler_tx.send(Signal::Batch(batch));
                    }
                }
                Err(e) => {
                    let _ = handler_tx.send(Signal::Error(e));
                }
            },
            config,
        )?;

        Ok(Self {
            watcher: Mutex::new(Some(watcher)),
            registry,
            tx,
            rx,
            closed: AtomicBool::new(false),
        })
    }

    /// Number of live directory registrations
    pub fn registration_count(&self) -> usize {
        self.registry.by_key.len()
    }
}

impl WatchService for NotifyWatchService {
    fn register(&self, dir: &Path, kinds: &[EventKind]) -> Result<WatchKey> {
        let mut guard = self.watcher.lock();
        let watcher = guard.as_mut().ok_or(WatchError::Closed)?;

        let existing = self.registry.key_for_dir(dir);
        let key = existing
            .unwrap_or_else(|| WatchKey(self.registry.next_key.fetch_add(1, Ordering::SeqCst)));

        // Record before subscribing so early events already resolve
        self.registry.by_dir.insert(
            dir.to_path_buf(),
            Registration {
                key,
                kinds: kinds.to_vec(),
            },
        );
        self.registry.by_key.insert(key, dir.to_path_buf());

        if let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive) {
            if existing.is_none() {
                self.registry.by_dir.remove(dir);
                self.registry.by_key.remove(&key);
            }
            return Err(e.into());
        }

        debug!(dir = %dir.display(), key = key.id(), "registered directory");
        Ok(key)
    }

    fn take(&self) -> std::result::Result<WatchBatch, TakeError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TakeError::Closed);
        }

        match self.rx.recv() {
            Ok(Signal::Batch(batch)) => Ok(batch),
            Ok(Signal::Error(e)) => Err(TakeError::Backend(e)),
            Ok(Signal::Closed) | Err(_) => Err(TakeError::Closed),
        }
    }

    fn reset(&self, key: WatchKey) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }

        let Some(dir) = self.registry.by_key.get(&key).map(|d| d.value().clone()) else {
            return false;
        };
        if dir.is_dir() {
            return true;
        }

        // Directory is gone: cancel the registration
        self.registry.by_key.remove(&key);
        self.registry.by_dir.remove_if(&dir, |_, reg| reg.key == key);
        if let Some(watcher) = self.watcher.lock().as_mut() {
            let _ = watcher.unwatch(&dir);
        }
        debug!(dir = %dir.display(), key = key.id(), "registration cancelled");
        false
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        drop(self.watcher.lock().take());
        self.registry.clear();
        let _ = self.tx.send(Signal::Closed);
        Ok(())
    }
}
