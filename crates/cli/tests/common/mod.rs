//! Helpers for driving the `pw` binary from integration tests

#![allow(dead_code)]

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

/// How long to wait for a running watcher to say something
pub const WAIT: Duration = Duration::from_secs(5);

/// Builder for one `pw` invocation
pub struct PwCommand {
    args: Vec<String>,
    working_dir: PathBuf,
}

impl PwCommand {
    pub fn new(working_dir: &Path) -> Self {
        Self {
            args: Vec::new(),
            working_dir: working_dir.to_path_buf(),
        }
    }

    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|a| a.to_string()));
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_pw"));
        command.args(&self.args).current_dir(&self.working_dir);
        command
    }

    /// Run to completion
    pub fn execute(&self) -> Result<CommandResult> {
        let output = self.command().output().context("Failed to execute pw")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;
        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }
        Ok(result)
    }

    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;
        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }
        Ok(result)
    }

    /// Start a long-running watch, streaming stdout and stderr lines
    pub fn spawn(&self) -> Result<RunningPw> {
        let mut child = self
            .command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn pw")?;

        let stdout = child.stdout.take().context("stdout not captured")?;
        let stderr = child.stderr.take().context("stderr not captured")?;

        Ok(RunningPw {
            child,
            stdout: stream_lines(stdout),
            stderr: stream_lines(stderr),
        })
    }
}

fn stream_lines<R: std::io::Read + Send + 'static>(reader: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(reader).lines().map_while(|l| l.ok()) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// A `pw` process that is killed on drop
pub struct RunningPw {
    child: Child,
    pub stdout: Receiver<String>,
    pub stderr: Receiver<String>,
}

impl RunningPw {
    /// Wait for a line on `rx` containing `needle`
    pub fn wait_for(rx: &Receiver<String>, needle: &str) -> Result<String> {
        let deadline = std::time::Instant::now() + WAIT;
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            let line = rx
                .recv_timeout(remaining)
                .with_context(|| format!("Timed out waiting for '{needle}'"))?;
            if line.contains(needle) {
                return Ok(line);
            }
        }
    }
}

impl Drop for RunningPw {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }
}

/// Shorthand for building a `pw` invocation
#[macro_export]
macro_rules! pw {
    ($dir:expr, $($arg:expr),*) => {{
        let mut cmd = $crate::common::PwCommand::new($dir);
        cmd.args(&[$($arg),*]);
        cmd
    }};
}
