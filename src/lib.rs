#![forbid(unsafe_code)]
//! pintos-racer
//!
//! Repeatedly builds and runs a Pintos test suite across several independent
//! working copies in parallel, to surface flaky/racy test failures that only
//! appear under repeated runs. Each worker owns a full copy of the source
//! tree and loops "build, then check" against it; outcomes are collected over
//! a channel and aggregated into a single summary once every worker is done.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` and `runner` modules
//!   enforce `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod runner;
pub mod version;

pub use runner::interfaces::{BuildTool, Make, RunnerError};
pub use runner::report::{ConsoleReporter, RaceReporter, RaceSummary, WorkerReport, SUMMARY_FILE};
pub use runner::worker::{IterationOutcome, WorkerId, WorkerMessage};
pub use runner::{run_races, Project, RaceConfig};
