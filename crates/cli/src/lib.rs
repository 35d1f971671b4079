//! Command-line front end for pathwatch

pub mod cmd;
pub mod logging;
pub mod settings;

use clap::{Parser, Subcommand};
use pathwatch::EventKind;
use std::path::PathBuf;

/// pw - watch a file or directory tree and print what changes
#[derive(Parser, Debug)]
#[command(name = "pw")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (default: <config dir>/pathwatch/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Debounce window for modify events in ms (0 disables)
    #[arg(long, global = true)]
    pub delay_ms: Option<u64>,

    /// Event kinds to report, comma separated
    #[arg(
        long,
        global = true,
        value_delimiter = ',',
        default_value = "create,modify,delete,overflow"
    )]
    pub events: Vec<EventKind>,

    /// Print events as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Watch a single file
    File {
        /// File to watch (missing parent directories are created)
        path: PathBuf,
    },
    /// Watch a directory tree
    Dir {
        /// Directory to watch (created if missing)
        path: PathBuf,

        /// Maximum recursion depth (default: from settings)
        #[arg(short, long)]
        depth: Option<usize>,
    },
    /// Show the effective settings
    Config,
}
