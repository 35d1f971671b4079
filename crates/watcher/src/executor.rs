//! Executors that run the blocking watch loop

use crate::error::{Result, WatchError};
use std::sync::atomic::{AtomicU64, Ordering};

/// Unit of work handed to an executor or scheduler
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs a watch loop somewhere other than the calling thread
pub trait Executor: Send + Sync {
    fn execute(&self, task: Task) -> Result<()>;
}

/// Spawns one named platform thread per task
#[derive(Debug, Default)]
pub struct ThreadExecutor {
    spawned: AtomicU64,
}

impl ThreadExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Executor for ThreadExecutor {
    fn execute(&self, task: Task) -> Result<()> {
        let n = self.spawned.fetch_add(1, Ordering::Relaxed);
        let name = format!("pathwatch-loop-{n}");
        std::thread::Builder::new()
            .name(name.clone())
            .spawn(task)
            .map_err(|e| WatchError::io(name, e))?;
        Ok(())
    }
}

/// Runs tasks on a tokio runtime's blocking pool
///
/// Lets several watchers share the threads of an application that already
/// runs tokio.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioExecutor {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime of the calling context. Panics outside a runtime.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, task: Task) -> Result<()> {
        // Detached: the loop ends on its own when the watcher stops
        drop(self.handle.spawn_blocking(task));
        Ok(())
    }
}
