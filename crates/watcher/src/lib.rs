//! Path watching for files and directory trees
//!
//! This crate layers a small lifecycle on top of the platform notification API
//! (via `notify`):
//! - Single-file watches (parent directory subscription, filtered by name)
//! - Recursive directory watches bounded by depth, with live pickup of new
//!   subdirectories
//! - Per-name debouncing of modify events (200ms default)
//! - Explicit `start()` / idempotent `stop()`
//!
//! ```no_run
//! use pathwatch::WatcherBuilder;
//!
//! # fn main() -> pathwatch::Result<()> {
//! let watcher = WatcherBuilder::dir("/tmp/inbox", 2)
//!     .on_create(|ctx| println!("created {}", ctx.path().display()))
//!     .on_modify(|ctx| println!("modified {}", ctx.path().display()))
//!     .build()?;
//! watcher.start()?;
//! // ...
//! watcher.stop();
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod context;
pub mod debounce;
pub mod dir;
pub mod error;
pub mod executor;
pub mod file;
pub mod scheduler;
pub mod service;
pub mod strategy;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::WatcherBuilder;
pub use config::WatchSettings;
pub use context::{EventKind, WatchEventContext};
pub use error::{Result, WatchError};
pub use executor::{Executor, ThreadExecutor, TokioExecutor};
pub use scheduler::{Scheduler, TimerScheduler};
pub use service::{NotifyWatchService, RawEvent, TakeError, WatchBatch, WatchKey, WatchService};
pub use strategy::WatchStrategy;
pub use watcher::{Callback, Handlers, PathWatcher, WatchOptions};

/// Debounce delay applied when none is configured
pub const DEFAULT_DELAY: std::time::Duration = std::time::Duration::from_millis(200);
