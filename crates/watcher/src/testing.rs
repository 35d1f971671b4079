//! Deterministic stand-ins for the service, scheduler and executor

use crate::context::EventKind;
use crate::error::{Result, WatchError};
use crate::executor::{Executor, Task};
use crate::scheduler::Scheduler;
use crate::service::{TakeError, WatchBatch, WatchKey, WatchService};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

enum Signal {
    Batch(WatchBatch),
    Error(notify::Error),
    Closed,
}

/// In-memory watch service fed by the test
pub struct FakeService {
    registrations: Mutex<Vec<(PathBuf, WatchKey)>>,
    next_key: AtomicU64,
    tx: Sender<Signal>,
    rx: Receiver<Signal>,
    closed: AtomicBool,
    close_calls: AtomicUsize,
    take_calls: AtomicUsize,
}

impl FakeService {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            registrations: Mutex::new(Vec::new()),
            next_key: AtomicU64::new(0),
            tx,
            rx,
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
            take_calls: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, batch: WatchBatch) {
        self.tx.send(Signal::Batch(batch)).unwrap();
    }

    pub fn push_error(&self, error: notify::Error) {
        self.tx.send(Signal::Error(error)).unwrap();
    }

    pub fn registered_dirs(&self) -> Vec<PathBuf> {
        self.registrations
            .lock()
            .iter()
            .map(|(dir, _)| dir.clone())
            .collect()
    }

    pub fn key_for(&self, dir: &Path) -> Option<WatchKey> {
        self.registrations
            .lock()
            .iter()
            .find(|(d, _)| d == dir)
            .map(|(_, key)| *key)
    }

    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn take_count(&self) -> usize {
        self.take_calls.load(Ordering::SeqCst)
    }
}

impl WatchService for FakeService {
    fn register(&self, dir: &Path, _kinds: &[EventKind]) -> Result<WatchKey> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(WatchError::Closed);
        }
        if let Some(key) = self.key_for(dir) {
            return Ok(key);
        }
        let key = WatchKey::new(self.next_key.fetch_add(1, Ordering::SeqCst));
        self.registrations.lock().push((dir.to_path_buf(), key));
        Ok(key)
    }

    fn take(&self) -> std::result::Result<WatchBatch, TakeError> {
        self.take_calls.fetch_add(1, Ordering::SeqCst);
        if self.closed.load(Ordering::SeqCst) {
            return Err(TakeError::Closed);
        }
        match self.rx.recv() {
            Ok(Signal::Batch(batch)) => Ok(batch),
            Ok(Signal::Error(e)) => Err(TakeError::Backend(e)),
            Ok(Signal::Closed) | Err(_) => Err(TakeError::Closed),
        }
    }

    fn reset(&self, _key: WatchKey) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(Signal::Closed);
        }
        Ok(())
    }
}

/// Scheduler whose tasks only run when the test says so
pub struct ManualScheduler {
    tasks: Mutex<Vec<Task>>,
    scheduled: AtomicUsize,
    shutdowns: AtomicUsize,
    shut_down: AtomicBool,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            scheduled: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Tasks accepted since creation
    pub fn scheduled_count(&self) -> usize {
        self.scheduled.load(Ordering::SeqCst)
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    /// Run every queued task, as if all delays had elapsed
    pub fn run_all(&self) {
        let tasks: Vec<Task> = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            task();
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, _delay: Duration, task: Task) -> Result<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(WatchError::SchedulerShutdown);
        }
        self.scheduled.fetch_add(1, Ordering::SeqCst);
        self.tasks.lock().push(task);
        Ok(())
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        self.shut_down.store(true, Ordering::SeqCst);
        self.tasks.lock().clear();
    }
}

/// Executor that parks submitted tasks until `run_pending`
pub struct ManualExecutor {
    tasks: Mutex<Vec<Task>>,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Run parked tasks on the calling thread
    pub fn run_pending(&self) {
        let tasks: Vec<Task> = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            task();
        }
    }
}

impl Executor for ManualExecutor {
    fn execute(&self, task: Task) -> Result<()> {
        self.tasks.lock().push(task);
        Ok(())
    }
}
