//! Watch a file or directory until Ctrl-C

use crate::{settings, Cli};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use pathwatch::{EventKind, TokioExecutor, WatchEventContext, WatcherBuilder};
use std::path::Path;
use std::sync::Arc;

pub async fn run_file(cli: &Cli, path: &Path) -> Result<()> {
    let settings = settings::resolve(cli)?;
    let builder = WatcherBuilder::file(path).with_settings(&settings);
    watch(cli, builder).await
}

pub async fn run_dir(cli: &Cli, path: &Path, depth: Option<usize>) -> Result<()> {
    let settings = settings::resolve(cli)?;
    let depth = depth.unwrap_or(settings.max_depth);
    let builder = WatcherBuilder::dir(path, depth).with_settings(&settings);
    watch(cli, builder).await
}

async fn watch(cli: &Cli, mut builder: WatcherBuilder) -> Result<()> {
    builder = builder.executor(Arc::new(TokioExecutor::current()));
    for kind in &cli.events {
        let json = cli.json;
        builder = builder.on(*kind, move |ctx: &WatchEventContext| print_event(ctx, json));
    }

    let watcher = builder.build().context("Failed to set up watcher")?;
    watcher.start().context("Failed to start watcher")?;

    eprintln!(
        "{} {} {}",
        "Watching".bold(),
        watcher.root().display(),
        "(Ctrl-C to stop)".dimmed()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    watcher.stop();
    Ok(())
}

fn print_event(ctx: &WatchEventContext, json: bool) {
    if json {
        match serde_json::to_string(ctx) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "failed to serialize event"),
        }
        return;
    }

    println!("{}", format_line(ctx));
}

/// One human-readable line: padded kind, then the path (dirs end in `/`)
pub fn format_line(ctx: &WatchEventContext) -> String {
    let kind = format!("{:<8}", ctx.kind().as_str());
    let kind = match ctx.kind() {
        EventKind::Create => kind.green().to_string(),
        EventKind::Modify => kind.yellow().to_string(),
        EventKind::Delete => kind.red().to_string(),
        EventKind::Overflow => kind.magenta().to_string(),
    };
    let suffix = if ctx.is_dir() { "/" } else { "" };
    format!("{kind} {}{suffix}", ctx.path().display())
}
