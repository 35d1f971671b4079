//! Per-name debouncing of modify events
//!
//! The first modify for a name opens a window of `delay`; further modifies for
//! that name inside the window are dropped. When the window closes the
//! callback runs once, with the context of the first event.

use crate::context::WatchEventContext;
use crate::error::WatchError;
use crate::scheduler::Scheduler;
use crate::watcher::Callback;
use dashmap::DashSet;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::{trace, warn};

pub struct Debouncer {
    delay: Duration,
    scheduler: Arc<dyn Scheduler>,
    pending: Arc<DashSet<String>>,
    /// Held while scheduling and while shutting down; `true` once shut down
    shut_down: Mutex<bool>,
}

impl Debouncer {
    pub fn new(delay: Duration, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            delay,
            scheduler,
            pending: Arc::new(DashSet::new()),
            shut_down: Mutex::new(false),
        }
    }

    /// Offer a modify event. Returns `true` if a dispatch was scheduled,
    /// `false` if it was coalesced into a pending one or the debouncer is
    /// shut down.
    pub fn offer(&self, key: String, ctx: WatchEventContext, callback: Callback) -> bool {
        if !self.pending.insert(key.clone()) {
            trace!(key = %key, "modify coalesced");
            return false;
        }

        let shut_down = self.shut_down.lock();
        if *shut_down {
            self.pending.remove(&key);
            return false;
        }

        let pending = Arc::clone(&self.pending);
        let task_key = key.clone();
        let task = Box::new(move || {
            pending.remove(&task_key);
            if catch_unwind(AssertUnwindSafe(|| callback(&ctx))).is_err() {
                warn!(path = %ctx.path().display(), "modify callback panicked");
            }
        });

        match self.scheduler.schedule(self.delay, task) {
            Ok(()) => true,
            Err(WatchError::SchedulerShutdown) => {
                self.pending.remove(&key);
                false
            }
            Err(e) => {
                warn!(key = %key, error = %e, "failed to schedule modify dispatch");
                self.pending.remove(&key);
                false
            }
        }
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.contains(key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Shut the scheduler down and forget pending names. Idempotent.
    pub fn shutdown(&self) {
        let mut shut_down = self.shut_down.lock();
        if *shut_down {
            return;
        }
        *shut_down = true;
        self.scheduler.shutdown();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EventKind;
    use crate::testing::ManualScheduler;
    use std::path::PathBuf;
    use std::sync::Mutex as StdMutex;

    fn ctx(path: &str) -> WatchEventContext {
        WatchEventContext::new(EventKind::Modify, PathBuf::from(path), false)
    }

    fn recorder() -> (Callback, Arc<StdMutex<Vec<WatchEventContext>>>) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: Callback = Arc::new(move |ctx: &WatchEventContext| {
            sink.lock().unwrap().push(ctx.clone());
        });
        (callback, seen)
    }

    #[test]
    fn test_burst_schedules_once() {
        let scheduler = Arc::new(ManualScheduler::new());
        let debouncer = Debouncer::new(Duration::from_millis(50), scheduler.clone());
        let (callback, seen) = recorder();

        assert!(debouncer.offer("a.txt".into(), ctx("/w/a.txt"), callback.clone()));
        assert!(!debouncer.offer("a.txt".into(), ctx("/w/a-second.txt"), callback.clone()));
        assert!(!debouncer.offer("a.txt".into(), ctx("/w/a-third.txt"), callback.clone()));

        assert_eq!(scheduler.scheduled_count(), 1);
        assert!(debouncer.is_pending("a.txt"));

        scheduler.run_all();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].path(), PathBuf::from("/w/a.txt").as_path());
        assert!(!debouncer.is_pending("a.txt"));
    }

    #[test]
    fn test_new_window_after_fire() {
        let scheduler = Arc::new(ManualScheduler::new());
        let debouncer = Debouncer::new(Duration::from_millis(50), scheduler.clone());
        let (callback, seen) = recorder();

        assert!(debouncer.offer("a.txt".into(), ctx("/w/a.txt"), callback.clone()));
        scheduler.run_all();
        assert!(debouncer.offer("a.txt".into(), ctx("/w/a.txt"), callback.clone()));
        scheduler.run_all();

        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_distinct_names_schedule_separately() {
        let scheduler = Arc::new(ManualScheduler::new());
        let debouncer = Debouncer::new(Duration::from_millis(50), scheduler.clone());
        let (callback, _) = recorder();

        assert!(debouncer.offer("a.txt".into(), ctx("/w/a.txt"), callback.clone()));
        assert!(debouncer.offer("b.txt".into(), ctx("/w/b.txt"), callback));
        assert_eq!(debouncer.pending_count(), 2);
        assert_eq!(scheduler.scheduled_count(), 2);
    }

    #[test]
    fn test_offer_after_shutdown_is_skipped() {
        let scheduler = Arc::new(ManualScheduler::new());
        let debouncer = Debouncer::new(Duration::from_millis(50), scheduler.clone());
        let (callback, _) = recorder();

        assert!(debouncer.offer("a.txt".into(), ctx("/w/a.txt"), callback.clone()));
        debouncer.shutdown();
        debouncer.shutdown();

        assert_eq!(scheduler.shutdown_count(), 1);
        assert_eq!(debouncer.pending_count(), 0);
        assert!(!debouncer.offer("b.txt".into(), ctx("/w/b.txt"), callback));
        assert_eq!(scheduler.scheduled_count(), 1);
        assert_eq!(debouncer.pending_count(), 0);
    }
}
