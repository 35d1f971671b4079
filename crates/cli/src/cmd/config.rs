//! Show the effective settings

use crate::{settings, Cli};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

pub fn run_show(cli: &Cli) -> Result<()> {
    let effective = settings::resolve(cli)?;
    let source = cli
        .config
        .clone()
        .or_else(settings::default_config_path);

    println!("{}", "Watch Settings".bold());
    match source {
        Some(path) if path.exists() => {
            println!("{}: {}\n", "Location".dimmed(), path.display().dimmed())
        }
        Some(path) => println!(
            "{}: {} {}\n",
            "Location".dimmed(),
            path.display().dimmed(),
            "(not found, using defaults)".dimmed()
        ),
        None => println!("{}\n", "(no config directory, using defaults)".dimmed()),
    }

    let rendered = toml::to_string_pretty(&effective).context("Failed to render settings")?;
    print!("{rendered}");

    println!("\n{}", "Notes:".bold());
    println!("  delay_ms: 0 disables debouncing");
    println!("  max_depth: 0 watches only the directory's own entries");
    Ok(())
}
