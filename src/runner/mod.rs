//! Parallel race runner
//!
//! Fan-out/fan-in over external build-tool invocations: stage N isolated
//! copies of the source tree, spawn one worker per copy, let each repeat
//! build+check M times, and collect every outcome over a single mpsc channel
//! until all workers have signaled completion.
//!
//! ## Modules
//!
//! - `stage` - scratch-directory teardown and tree copies
//! - `worker` - the per-tree build+check loop
//! - `report` - summary aggregation, rendering, and the reporter trait
//! - `interfaces` - the build-tool trait seam and the error type
//!
//! ## Design
//!
//! Workers never share filesystem state (each owns a disjoint tree copy) and
//! never talk to each other; the channel is strictly one-directional. The
//! collector keys every outcome explicitly by worker and iteration and never
//! assumes arrival order. There is no cancellation or timeout: a hung
//! build/check subprocess blocks its worker, and thus the run, indefinitely.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod interfaces;
pub mod report;
pub mod stage;
pub mod worker;

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use interfaces::{BuildTool, RunnerError};
use report::{RaceReporter, RaceSummary, WorkerReport};
use worker::{Worker, WorkerMessage};

/// The Pintos project whose test suite is being raced.
///
/// Doubles as the name of the subdirectory (inside each tree copy) where the
/// build tool runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Project {
    Threads,
    Userprog,
    Vm,
    Filesys,
}

impl Project {
    pub fn dir_name(self) -> &'static str {
        match self {
            Project::Threads => "threads",
            Project::Userprog => "userprog",
            Project::Vm => "vm",
            Project::Filesys => "filesys",
        }
    }
}

/// Configuration for one run. Built by the CLI from its arguments; there is
/// no process-wide state.
#[derive(Debug, Clone)]
pub struct RaceConfig {
    /// Path to the Pintos source tree to copy
    pub source: PathBuf,
    /// Project whose check target is raced
    pub project: Project,
    /// Number of parallel workers (isolated tree copies)
    pub workers: usize,
    /// Build+check iterations per worker
    pub iterations: usize,
    /// Throwaway directory holding all tree copies for this run
    pub scratch_dir: PathBuf,
}

/// Stage the worktrees and race the test suite.
///
/// Validates the source path, resets the scratch directory, stages one tree
/// copy per worker, then runs all workers to completion. The summary always
/// covers every worker; there are no partial summaries.
pub fn run_races(
    config: &RaceConfig,
    tool: Arc<dyn BuildTool + Send + Sync>,
    reporter: &mut dyn RaceReporter,
) -> Result<RaceSummary, RunnerError> {
    if !config.source.is_dir() {
        return Err(RunnerError::SourceMissing(config.source.clone()));
    }

    reporter.on_stage_start(config.workers);
    let trees = stage::stage_worktrees(&config.source, &config.scratch_dir, config.workers)?;

    run_staged(config, &trees, tool, reporter)
}

/// Race the test suite over already-staged trees.
///
/// Spawns one thread per worker (each thread's work is dominated by its
/// external build subprocesses, so this is true OS-level parallelism) and
/// drains the outcome channel until a `Finished` sentinel has been seen for
/// every worker, joining each thread as its sentinel arrives.
pub fn run_staged(
    config: &RaceConfig,
    trees: &[PathBuf],
    tool: Arc<dyn BuildTool + Send + Sync>,
    reporter: &mut dyn RaceReporter,
) -> Result<RaceSummary, RunnerError> {
    reporter.on_run_start();
    let start = Instant::now();

    let (tx, rx) = mpsc::channel();
    let mut handles: Vec<Option<thread::JoinHandle<()>>> = Vec::with_capacity(trees.len());
    for (id, tree) in trees.iter().enumerate() {
        let worker = Worker::new(id, tree, config.project, config.iterations, Arc::clone(&tool));
        let tx = tx.clone();
        handles.push(Some(thread::spawn(move || worker.run(&tx))));
        tracing::debug!(worker = id, "worker spawned");
    }
    // Only workers hold senders now, so a lost worker cannot hang the drain
    // loop forever: the channel disconnects once every sender is gone.
    drop(tx);

    let mut reports = vec![WorkerReport::default(); trees.len()];
    let mut done = 0;
    while done < trees.len() {
        match rx.recv() {
            Ok(WorkerMessage::Outcome(outcome)) => {
                reporter.on_outcome(&outcome);
                reports[outcome.worker].outcomes.push(outcome);
            }
            Ok(WorkerMessage::Fatal { worker }) => {
                reporter.on_worker_fatal(worker);
                reports[worker].aborted = true;
            }
            Ok(WorkerMessage::Finished { worker }) => {
                join_worker(&mut handles, worker)?;
                reporter.on_worker_finished(worker);
                done += 1;
            }
            Err(_) => break,
        }
    }

    // Any handle still present belongs to a worker that died without its
    // sentinel, i.e. a panic.
    for worker in 0..handles.len() {
        join_worker(&mut handles, worker)?;
    }

    let summary = RaceSummary::new(reports, start.elapsed());
    reporter.on_run_complete(&summary);
    Ok(summary)
}

fn join_worker(
    handles: &mut [Option<thread::JoinHandle<()>>],
    worker: usize,
) -> Result<(), RunnerError> {
    if let Some(handle) = handles[worker].take() {
        handle
            .join()
            .map_err(|_| RunnerError::WorkerPanicked { worker })?;
        tracing::debug!(worker, "worker joined");
    }
    Ok(())
}
