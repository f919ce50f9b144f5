//! Runner I/O boundary interfaces
//!
//! This module defines the trait-based abstraction around the external build
//! tool (the `make` invocations) plus the runner's error type:
//! - Build step (`make --always-make`, forced full rebuild)
//! - Check step (`make -C build check`, exit code is the pass/fail signal)
//!
//! The trait boundary allows the worker loop and the orchestration to be
//! exercised in tests without a real Pintos tree or a real `make`.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

/// Errors that occur while staging trees or driving a run
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("source path '{0}' does not exist or is not a directory")]
    SourceMissing(PathBuf),

    #[error("failed to reset scratch directory '{path}': {source}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to stage worker tree '{path}': {source}")]
    Stage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },

    #[error("failed to write summary '{path}': {source}")]
    Summary {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

// ============================================================================
// Build Tool Interface
// ============================================================================

/// Invoke the external build tool for one worker tree.
///
/// Both steps run in the worker's project directory and are judged purely by
/// exit code (0 = success). All subprocess stdout+stderr goes to the given
/// append-only log file.
pub trait BuildTool {
    /// Force a full rebuild. Returns `Ok(true)` iff the subprocess exited 0.
    fn build(&self, dir: &Path, log: &File) -> io::Result<bool>;

    /// Run the check target against the latest build. Returns `Ok(true)` iff
    /// the subprocess exited 0.
    fn check(&self, dir: &Path, log: &File) -> io::Result<bool>;
}

/// Run a command in `dir` with stdout+stderr appended to `log`.
///
/// The log handle is cloned for each stream; because the file is opened in
/// append mode, writes from build and check subprocesses never clobber each
/// other's output.
pub fn run_command(cmd: &mut Command, dir: &Path, log: &File) -> io::Result<bool> {
    let status = cmd
        .current_dir(dir)
        .stdout(Stdio::from(log.try_clone()?))
        .stderr(Stdio::from(log.try_clone()?))
        .status()?;
    Ok(status.success())
}

// ============================================================================
// Default Implementation (make)
// ============================================================================

/// The real build tool: `make` inside a Pintos project directory.
pub struct Make;

impl BuildTool for Make {
    fn build(&self, dir: &Path, log: &File) -> io::Result<bool> {
        run_command(Command::new("make").arg("--always-make"), dir, log)
    }

    fn check(&self, dir: &Path, log: &File) -> io::Result<bool> {
        run_command(Command::new("make").args(["-C", "build", "check"]), dir, log)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs::{self, OpenOptions};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_run_command_reports_exit_code() {
        let dir = temp_dir("pintos_racer_run_command");
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("log.output"))
            .unwrap();

        assert!(run_command(Command::new("sh").args(["-c", "exit 0"]), &dir, &log).unwrap());
        assert!(!run_command(Command::new("sh").args(["-c", "exit 3"]), &dir, &log).unwrap());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_run_command_appends_output() {
        let dir = temp_dir("pintos_racer_run_command_log");
        let log_path = dir.join("log.output");
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .unwrap();

        run_command(Command::new("sh").args(["-c", "echo first"]), &dir, &log).unwrap();
        run_command(Command::new("sh").args(["-c", "echo second 1>&2"]), &dir, &log).unwrap();

        let contents = fs::read_to_string(&log_path).unwrap();
        assert!(contents.contains("first"));
        assert!(contents.contains("second"));

        let _ = fs::remove_dir_all(&dir);
    }
}
