//! Delayed task scheduling for debounced dispatch

use crate::error::{Result, WatchError};
use crate::executor::Task;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};
use tokio::time::Instant;
use tracing::{trace, warn};

/// Runs tasks after a delay
pub trait Scheduler: Send + Sync {
    /// Queue `task` to run once `delay` has elapsed.
    ///
    /// Fails with [`WatchError::SchedulerShutdown`] after `shutdown()`.
    fn schedule(&self, delay: Duration, task: Task) -> Result<()>;

    /// Stop accepting tasks and drop the ones not yet run. Idempotent.
    fn shutdown(&self);
}

/// Timer backed by a private single-worker tokio runtime
///
/// Each scheduled task sleeps on the runtime's timer, then runs on its worker
/// thread. A panicking task is logged and does not take the worker down.
/// Shutting down drops the runtime in the background, cancelling every task
/// still waiting for its deadline.
pub struct TimerScheduler {
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
    shut_down: AtomicBool,
}

impl TimerScheduler {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("pathwatch-timer")
            .enable_time()
            .build()
            .map_err(|e| WatchError::io("pathwatch-timer", e))?;
        let handle = runtime.handle().clone();

        Ok(Self {
            runtime: Mutex::new(Some(runtime)),
            handle,
            shut_down: AtomicBool::new(false),
        })
    }
}

impl Scheduler for TimerScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> Result<()> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(WatchError::SchedulerShutdown);
        }
        let deadline = Instant::now()
            .checked_add(delay)
            .ok_or_else(|| WatchError::Config(format!("delay {delay:?} is out of range")))?;

        self.handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if catch_unwind(AssertUnwindSafe(task)).is_err() {
                warn!("scheduled task panicked");
            }
        });
        Ok(())
    }

    fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(runtime) = self.runtime.lock().take() {
            trace!("timer shutting down");
            runtime.shutdown_background();
        }
    }
}

impl Drop for TimerScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
