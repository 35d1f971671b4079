//! The watch loop and its lifecycle
//!
//! A [`PathWatcher`] goes `CREATED -> STARTED -> STOPPED` exactly once:
//! - `start()` registers the root through its strategy and hands the loop to
//!   the executor; a second call always fails
//! - `stop()` closes the watch service, which wakes the blocked loop, and
//!   shuts the debounce scheduler down; extra calls are no-ops
//!
//! Create, delete and overflow callbacks run synchronously on the loop thread.
//! Modify callbacks go through the [`Debouncer`] unless the delay is zero.

use crate::context::{EventKind, WatchEventContext};
use crate::debounce::Debouncer;
use crate::error::{Result, WatchError};
use crate::executor::{Executor, ThreadExecutor};
use crate::scheduler::{Scheduler, TimerScheduler};
use crate::service::{NotifyWatchService, RawEvent, TakeError, WatchBatch, WatchKey, WatchService};
use crate::strategy::WatchStrategy;
use crate::DEFAULT_DELAY;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// User callback for one event kind
pub type Callback = Arc<dyn Fn(&WatchEventContext) + Send + Sync>;

/// Callbacks keyed by event kind
#[derive(Clone, Default)]
pub struct Handlers {
    pub create: Option<Callback>,
    pub modify: Option<Callback>,
    pub delete: Option<Callback>,
    pub overflow: Option<Callback>,
}

impl Handlers {
    pub fn get(&self, kind: EventKind) -> Option<&Callback> {
        match kind {
            EventKind::Create => self.create.as_ref(),
            EventKind::Modify => self.modify.as_ref(),
            EventKind::Delete => self.delete.as_ref(),
            EventKind::Overflow => self.overflow.as_ref(),
        }
    }

    pub fn set(&mut self, kind: EventKind, callback: Callback) {
        let slot = match kind {
            EventKind::Create => &mut self.create,
            EventKind::Modify => &mut self.modify,
            EventKind::Delete => &mut self.delete,
            EventKind::Overflow => &mut self.overflow,
        };
        *slot = Some(callback);
    }

    /// Kinds that have a callback
    pub fn kinds(&self) -> Vec<EventKind> {
        EventKind::ALL
            .into_iter()
            .filter(|k| self.get(*k).is_some())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds().is_empty()
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}

/// Low-level construction options
///
/// Anything left `None` gets a per-watcher default: a fresh notify backend, a
/// dedicated loop thread, and a dedicated timer thread.
pub struct WatchOptions {
    /// Debounce window for modify events; zero dispatches them immediately
    pub delay: Duration,
    /// Passed through to the notify backend
    pub modifiers: notify::Config,
    pub executor: Option<Arc<dyn Executor>>,
    pub scheduler: Option<Arc<dyn Scheduler>>,
    pub service: Option<Arc<dyn WatchService>>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            modifiers: notify::Config::default(),
            executor: None,
            scheduler: None,
            service: None,
        }
    }
}

struct Inner {
    strategy: Arc<dyn WatchStrategy>,
    handlers: Handlers,
    /// Kinds registered with the service: callbacks plus strategy needs
    kinds: Vec<EventKind>,
    service: Arc<dyn WatchService>,
    executor: Arc<dyn Executor>,
    delay: Duration,
    debouncer: Option<Debouncer>,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl Inner {
    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn root(&self) -> &Path {
        self.strategy.root()
    }

    fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }

        info!(root = %self.root().display(), "stopping watcher");
        if let Err(e) = self.service.close() {
            warn!(root = %self.root().display(), error = %e, "failed to close watch service");
        }
        if let Some(debouncer) = &self.debouncer {
            debouncer.shutdown();
        }
    }

    fn run(&self) {
        if self.is_stopped() {
            debug!(root = %self.root().display(), "stopped before watch loop began");
            return;
        }
        debug!(root = %self.root().display(), "watch loop running");

        loop {
            let batch = match self.service.take() {
                Ok(batch) => batch,
                Err(TakeError::Closed) => {
                    self.stop();
                    break;
                }
                Err(TakeError::Backend(e)) => {
                    warn!(root = %self.root().display(), error = %e, "backend error, skipping iteration");
                    if self.is_stopped() {
                        break;
                    }
                    continue;
                }
            };

            self.process(&batch);

            if !self.service.reset(batch.key) {
                debug!(root = %self.root().display(), key = batch.key.id(), "watch key no longer valid");
            }
            if self.is_stopped() {
                break;
            }
        }

        debug!(root = %self.root().display(), "watch loop exited");
    }

    fn process(&self, batch: &WatchBatch) {
        for event in &batch.events {
            if catch_unwind(AssertUnwindSafe(|| self.handle(batch.key, event))).is_err() {
                warn!(
                    root = %self.root().display(),
                    key = batch.key.id(),
                    name = ?event.name,
                    "event handling panicked, skipping event"
                );
            }
        }
    }

    fn handle(&self, key: WatchKey, event: &RawEvent) {
        let Some(path) = self.strategy.resolve(key, event) else {
            trace!(key = key.id(), name = ?event.name, "event not applicable");
            return;
        };

        let mut discovered = Vec::new();
        if event.kind == EventKind::Create {
            match self
                .strategy
                .on_created(self.service.as_ref(), key, &path, &self.kinds)
            {
                Ok(found) => discovered = found,
                Err(e) => warn!(
                    root = %self.root().display(),
                    path = %path.display(),
                    error = %e,
                    "failed to register new directory"
                ),
            }
        }

        let Some(callback) = self.handlers.get(event.kind) else {
            return;
        };
        let ctx = WatchEventContext::observe(event.kind, path);

        match &self.debouncer {
            Some(debouncer) if event.kind == EventKind::Modify && !self.delay.is_zero() => {
                debouncer.offer(event.debounce_key(), ctx, Arc::clone(callback));
            }
            _ => self.invoke(callback, &ctx),
        }

        for entry in discovered {
            self.invoke(callback, &WatchEventContext::observe(EventKind::Create, entry));
        }
    }

    fn invoke(&self, callback: &Callback, ctx: &WatchEventContext) {
        trace!(kind = %ctx.kind(), path = %ctx.path().display(), "dispatching");
        if catch_unwind(AssertUnwindSafe(|| callback(ctx))).is_err() {
            warn!(
                root = %self.root().display(),
                kind = %ctx.kind(),
                path = %ctx.path().display(),
                "callback panicked"
            );
        }
    }
}

/// A file or directory watch
///
/// Dropping the watcher stops it.
pub struct PathWatcher {
    inner: Arc<Inner>,
}

impl PathWatcher {
    /// Assemble a watcher around a prepared strategy.
    ///
    /// Fails with [`WatchError::Config`] when no callback is set. Creates the
    /// notify backend unless one is injected through `options`.
    pub fn new(
        strategy: Arc<dyn WatchStrategy>,
        handlers: Handlers,
        options: WatchOptions,
    ) -> Result<Self> {
        if handlers.is_empty() {
            return Err(WatchError::Config(
                "at least one callback must be configured".to_string(),
            ));
        }

        let service: Arc<dyn WatchService> = match options.service {
            Some(service) => service,
            None => Arc::new(NotifyWatchService::new(options.modifiers)?),
        };
        let executor = options
            .executor
            .unwrap_or_else(|| Arc::new(ThreadExecutor::new()));
        let debouncer = match options.scheduler {
            Some(scheduler) => Some(Debouncer::new(options.delay, scheduler)),
            None if options.delay.is_zero() => None,
            None => Some(Debouncer::new(options.delay, Arc::new(TimerScheduler::new()?))),
        };

        let mut kinds = handlers.kinds();
        for kind in strategy.required_kinds() {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }

        Ok(Self {
            inner: Arc::new(Inner {
                strategy,
                handlers,
                kinds,
                service,
                executor,
                delay: options.delay,
                debouncer,
                started: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
            }),
        })
    }

    /// Register the root and start the watch loop.
    ///
    /// Fails with [`WatchError::IllegalState`] on any call after the first,
    /// and after `stop()`. A registration or executor failure stops the
    /// watcher and is returned.
    pub fn start(&self) -> Result<()> {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return Err(WatchError::IllegalState(
                "watcher has already been started".to_string(),
            ));
        }
        if self.inner.is_stopped() {
            return Err(WatchError::IllegalState(
                "watcher has already been stopped".to_string(),
            ));
        }

        info!(
            root = %self.inner.root().display(),
            kinds = ?self.inner.kinds,
            delay_ms = self.inner.delay.as_millis() as u64,
            "starting watcher"
        );

        if let Err(e) = self
            .inner
            .strategy
            .register(self.inner.service.as_ref(), &self.inner.kinds)
        {
            self.inner.stop();
            return Err(e);
        }

        let inner = Arc::clone(&self.inner);
        if let Err(e) = self.inner.executor.execute(Box::new(move || inner.run())) {
            self.inner.stop();
            return Err(e);
        }
        Ok(())
    }

    /// Stop watching. Idempotent; does not wait for a running callback.
    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn is_running(&self) -> bool {
        self.inner.started.load(Ordering::Acquire) && !self.inner.is_stopped()
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.is_stopped()
    }

    /// The watched file or directory (absolute)
    pub fn root(&self) -> &Path {
        self.inner.root()
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// Names currently waiting for a debounced modify dispatch
    pub fn pending_modifies(&self) -> usize {
        self.inner
            .debouncer
            .as_ref()
            .map_or(0, |d| d.pending_count())
    }
}

impl fmt::Debug for PathWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathWatcher")
            .field("root", &self.inner.root())
            .field("handlers", &self.inner.handlers)
            .field("delay", &self.inner.delay)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Drop for PathWatcher {
    fn drop(&mut self) {
        self.inner.stop();
    }
}
