//! Validated construction of file and directory watchers

use crate::config::WatchSettings;
use crate::context::{EventKind, WatchEventContext};
use crate::dir::DirTree;
use crate::error::{Result, WatchError};
use crate::executor::Executor;
use crate::file::FileTarget;
use crate::scheduler::Scheduler;
use crate::service::WatchService;
use crate::strategy::WatchStrategy;
use crate::watcher::{Handlers, PathWatcher, WatchOptions};
use crate::DEFAULT_DELAY;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Target {
    File(PathBuf),
    Dir { path: PathBuf, max_depth: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delay {
    Default,
    Custom(Duration),
    Disabled,
}

/// Builder for a [`PathWatcher`]
///
/// The entry point picks the kind of watch; `build()` validates and returns
/// a watcher that still has to be started.
pub struct WatcherBuilder {
    target: Target,
    handlers: Handlers,
    delay: Delay,
    modifiers: notify::Config,
    executor: Option<Arc<dyn Executor>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    service: Option<Arc<dyn WatchService>>,
}

impl WatcherBuilder {
    fn new(target: Target) -> Self {
        Self {
            target,
            handlers: Handlers::default(),
            delay: Delay::Default,
            modifiers: notify::Config::default(),
            executor: None,
            scheduler: None,
            service: None,
        }
    }

    /// Watch a single file. Missing parent directories are created at build
    /// time; the file itself may appear later.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::new(Target::File(path.as_ref().to_path_buf()))
    }

    /// Watch a directory tree down to `max_depth` (0 = the directory's own
    /// entries only). A missing directory is created at build time.
    pub fn dir(path: impl AsRef<Path>, max_depth: usize) -> Self {
        Self::new(Target::Dir {
            path: path.as_ref().to_path_buf(),
            max_depth,
        })
    }

    /// Set the callback for `kind`, replacing any earlier one
    pub fn on<F>(mut self, kind: EventKind, callback: F) -> Self
    where
        F: Fn(&WatchEventContext) + Send + Sync + 'static,
    {
        self.handlers.set(kind, Arc::new(callback));
        self
    }

    pub fn on_create<F>(self, callback: F) -> Self
    where
        F: Fn(&WatchEventContext) + Send + Sync + 'static,
    {
        self.on(EventKind::Create, callback)
    }

    pub fn on_modify<F>(self, callback: F) -> Self
    where
        F: Fn(&WatchEventContext) + Send + Sync + 'static,
    {
        self.on(EventKind::Modify, callback)
    }

    pub fn on_delete<F>(self, callback: F) -> Self
    where
        F: Fn(&WatchEventContext) + Send + Sync + 'static,
    {
        self.on(EventKind::Delete, callback)
    }

    pub fn on_overflow<F>(self, callback: F) -> Self
    where
        F: Fn(&WatchEventContext) + Send + Sync + 'static,
    {
        self.on(EventKind::Overflow, callback)
    }

    /// Debounce window for modify events. Must be non-zero; see
    /// [`without_debounce`](Self::without_debounce).
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Delay::Custom(delay);
        self
    }

    /// Dispatch modify events as they arrive
    pub fn without_debounce(mut self) -> Self {
        self.delay = Delay::Disabled;
        self
    }

    /// Backend options, passed to notify as-is
    pub fn modifiers(mut self, modifiers: notify::Config) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Run the watch loop on this executor instead of a dedicated thread
    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Schedule debounced dispatches here instead of a dedicated timer
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Use this watch service instead of a fresh notify backend
    pub fn service(mut self, service: Arc<dyn WatchService>) -> Self {
        self.service = Some(service);
        self
    }

    /// Apply delay and backend options from settings
    pub fn with_settings(mut self, settings: &WatchSettings) -> Self {
        self.delay = match settings.delay_ms {
            0 => Delay::Disabled,
            _ => Delay::Custom(settings.delay()),
        };
        self.modifiers = settings.notify_config();
        self
    }

    fn resolve_delay(&self) -> Result<Duration> {
        match self.delay {
            Delay::Default => Ok(DEFAULT_DELAY),
            Delay::Disabled => Ok(Duration::ZERO),
            Delay::Custom(d) if d.is_zero() => Err(WatchError::Config(
                "delay must be greater than zero; use without_debounce() to disable".to_string(),
            )),
            Delay::Custom(d) => Ok(d),
        }
    }

    /// Validate, prepare the root on disk and assemble the watcher
    pub fn build(self) -> Result<PathWatcher> {
        if self.handlers.is_empty() {
            return Err(WatchError::Config(
                "at least one callback must be configured".to_string(),
            ));
        }
        let delay = self.resolve_delay()?;

        let strategy: Arc<dyn WatchStrategy> = match &self.target {
            Target::File(path) => Arc::new(FileTarget::prepare(path)?),
            Target::Dir { path, max_depth } => Arc::new(DirTree::prepare(path, *max_depth)?),
        };

        PathWatcher::new(
            strategy,
            self.handlers,
            WatchOptions {
                delay,
                modifiers: self.modifiers,
                executor: self.executor,
                scheduler: self.scheduler,
                service: self.service,
            },
        )
    }
}
