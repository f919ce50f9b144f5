//! CLI module for pintos-racer
//!
//! This module provides the command-line interface for the runner.
//!
//! ## Usage
//!
//! `pintos-racer <PATH> <PROJECT> [-p N] [-t N] [--scratch-dir DIR] [-v]`
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.
//!
//! The exit code mirrors the run outcome: 0 on full success, otherwise the
//! number of failed iterations (clamped to 255, and at least 1 when a build
//! broke even if no check failed).

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::fmt;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;

use crate::runner::interfaces::Make;
use crate::runner::report::{ConsoleReporter, SUMMARY_FILE};
use crate::runner::{run_races, Project, RaceConfig};
use crate::version::RACER_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Hunt flaky Pintos tests by racing repeated build+check runs in parallel
#[derive(Parser, Debug)]
#[command(name = "pintos-racer")]
#[command(version = RACER_VERSION)]
#[command(about = "Race a Pintos test suite across isolated tree copies", long_about = None)]
pub struct Cli {
    /// Path to the Pintos source tree (usually `src`)
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Project whose test suite to race
    #[arg(value_name = "PROJECT", value_enum)]
    pub project: Project,

    /// Number of parallel workers, each with its own copy of the tree
    #[arg(short = 'p', long = "processes", value_name = "N", default_value_t = 1)]
    pub processes: usize,

    /// Build+check iterations per worker
    #[arg(short = 't', long = "times", value_name = "N", default_value_t = 1)]
    pub times: usize,

    /// Scratch directory holding the worker tree copies
    #[arg(long = "scratch-dir", value_name = "DIR", default_value = "testing-races")]
    pub scratch_dir: PathBuf,

    /// Print each iteration's outcome as it completes
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. The command
/// implementation returns `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the race and return the result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    if cli.processes == 0 {
        return Err(CliError::failure("Error: --processes must be at least 1"));
    }
    if cli.times == 0 {
        return Err(CliError::failure("Error: --times must be at least 1"));
    }
    if !cli.path.is_dir() {
        return Err(CliError::failure(format!(
            "Error: path to pintos '{}' does not exist or is not a directory",
            cli.path.display()
        )));
    }

    let config = RaceConfig {
        source: cli.path,
        project: cli.project,
        workers: cli.processes,
        iterations: cli.times,
        scratch_dir: cli.scratch_dir,
    };

    race(&config, cli.verbose)
}

/// Stage, run, write the summary file, and derive the exit code.
fn race(config: &RaceConfig, verbose: bool) -> CliResult<ExitCode> {
    let mut reporter = ConsoleReporter::new(verbose);
    let summary = run_races(config, Arc::new(Make), &mut reporter)
        .map_err(|e| CliError::failure(format!("Error: {e}")))?;

    summary
        .write_to(Path::new(SUMMARY_FILE))
        .map_err(|e| CliError::failure(format!("Error: {e}")))?;

    if summary.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        // Summary already printed by the reporter; exit with the fail count.
        let code = summary.failed_iterations().clamp(1, 255);
        Err(CliError::new("", ExitCode(code as i32)))
    }
}

// ============================================================================
// Tests
// ============================================================================
