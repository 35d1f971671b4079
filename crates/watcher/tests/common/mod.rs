//! Common utilities for watch integration tests

use crossbeam_channel::{unbounded, Receiver, Sender};
use pathwatch::{EventKind, WatchEventContext, WatcherBuilder};
use std::path::Path;
use std::time::{Duration, Instant};

/// How long to wait for an event that should arrive
pub const WAIT: Duration = Duration::from_secs(5);

/// How long to watch for an event that should not arrive
pub const QUIET: Duration = Duration::from_millis(400);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Collects every dispatched context on a channel
#[derive(Clone)]
pub struct Recorder {
    tx: Sender<WatchEventContext>,
}

impl Recorder {
    pub fn new() -> (Self, Receiver<WatchEventContext>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    /// Register this recorder for every kind in `kinds`
    pub fn attach(&self, mut builder: WatcherBuilder, kinds: &[EventKind]) -> WatcherBuilder {
        for kind in kinds {
            let tx = self.tx.clone();
            builder = builder.on(*kind, move |ctx: &WatchEventContext| {
                let _ = tx.send(ctx.clone());
            });
        }
        builder
    }
}

/// Wait for the first context matching `pred`, skipping others
pub fn expect_event(
    rx: &Receiver<WatchEventContext>,
    pred: impl Fn(&WatchEventContext) -> bool,
) -> WatchEventContext {
    let deadline = Instant::now() + WAIT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(ctx) if pred(&ctx) => return ctx,
            Ok(_) => continue,
            Err(_) => panic!("timed out waiting for event"),
        }
    }
}

/// Drain events for `QUIET` and return the ones matching `pred`
pub fn collect_for(
    rx: &Receiver<WatchEventContext>,
    pred: impl Fn(&WatchEventContext) -> bool,
) -> Vec<WatchEventContext> {
    let deadline = Instant::now() + QUIET;
    let mut seen = Vec::new();
    while let Ok(ctx) = rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        if pred(&ctx) {
            seen.push(ctx);
        }
    }
    seen
}

pub fn named(name: &'static str) -> impl Fn(&WatchEventContext) -> bool {
    move |ctx| ctx.path().file_name().is_some_and(|n| n == name)
}

pub fn touch(path: &Path, contents: &str) {
    std::fs::write(path, contents).unwrap();
}
