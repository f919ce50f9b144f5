//! Summary aggregation and reporting
//!
//! ## RaceReporter Trait
//!
//! The runner uses a `RaceReporter` trait to separate live reporting from
//! execution. This allows for custom output formats (quiet runs in tests,
//! machine-readable output later) by implementing the trait; the default
//! `ConsoleReporter` prints progress and the final summary to the terminal.
//!
//! The summary itself is built once, after every worker has been accounted
//! for, and is never mutated afterwards.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::interfaces::RunnerError;
use super::worker::{IterationOutcome, WorkerId, BUILD_LOG};

/// Name of the top-level summary file, written to the current directory.
pub const SUMMARY_FILE: &str = "result_summary.output";

/// Trait for reporting run progress as it happens.
pub trait RaceReporter {
    /// Called before the scratch directory is (re)created
    fn on_stage_start(&mut self, _worker_count: usize) {}

    /// Called once all trees are staged and workers are about to start
    fn on_run_start(&mut self) {}

    /// Called for every collected iteration outcome, in arrival order
    fn on_outcome(&mut self, _outcome: &IterationOutcome) {}

    /// Called when a worker aborts on a build break
    fn on_worker_fatal(&mut self, _worker: WorkerId) {}

    /// Called when a worker's completion sentinel has been collected
    fn on_worker_finished(&mut self, _worker: WorkerId) {}

    /// Called once with the final summary
    fn on_run_complete(&mut self, _summary: &RaceSummary) {}
}

/// Silent reporter, for library callers that only want the summary.
impl RaceReporter for () {}

/// Default console reporter.
#[derive(Default)]
pub struct ConsoleReporter {
    pub verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl RaceReporter for ConsoleReporter {
    fn on_stage_start(&mut self, _worker_count: usize) {
        println!("setting up testing directories");
    }

    fn on_run_start(&mut self) {
        println!("running tests (this will take a while)");
    }

    fn on_outcome(&mut self, outcome: &IterationOutcome) {
        if self.verbose {
            let status = if outcome.passed {
                "\x1b[32mpassed\x1b[0m"
            } else {
                "\x1b[31mFAILED\x1b[0m"
            };
            println!(
                "worker {} test {}: {}",
                outcome.worker, outcome.iteration, status
            );
        }
    }

    fn on_worker_fatal(&mut self, worker: WorkerId) {
        eprintln!("worker {worker}: build failed (see {BUILD_LOG} in its tree)");
    }

    fn on_worker_finished(&mut self, worker: WorkerId) {
        if self.verbose {
            println!("worker {worker} finished");
        }
    }

    fn on_run_complete(&mut self, summary: &RaceSummary) {
        print!("{}", summary.render());
    }
}

/// Everything one worker produced.
#[derive(Debug, Clone, Default)]
pub struct WorkerReport {
    /// Outcomes in iteration order
    pub outcomes: Vec<IterationOutcome>,
    /// The worker's build broke; nothing after `outcomes` was recorded
    pub aborted: bool,
}

impl WorkerReport {
    pub fn failed_iterations(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.passed).count()
    }
}

/// Final aggregated result of one run. Workers are indexed by `WorkerId`, so
/// enumeration order is always 0..N regardless of completion order.
#[derive(Debug, Clone)]
pub struct RaceSummary {
    workers: Vec<WorkerReport>,
    pub elapsed: Duration,
}

impl RaceSummary {
    /// Build the summary. Outcomes are re-keyed by iteration index here, so
    /// the caller may hand them over in arrival order.
    pub fn new(mut workers: Vec<WorkerReport>, elapsed: Duration) -> Self {
        for report in &mut workers {
            report.outcomes.sort_by_key(|o| o.iteration);
        }
        Self { workers, elapsed }
    }

    pub fn workers(&self) -> &[WorkerReport] {
        &self.workers
    }

    /// Total failed check iterations across all workers.
    pub fn failed_iterations(&self) -> usize {
        self.workers.iter().map(WorkerReport::failed_iterations).sum()
    }

    /// Workers whose build broke.
    pub fn aborted_workers(&self) -> usize {
        self.workers.iter().filter(|w| w.aborted).count()
    }

    /// True when every iteration passed and no build broke.
    pub fn is_clean(&self) -> bool {
        self.failed_iterations() == 0 && self.aborted_workers() == 0
    }

    /// Render the summary text: one banner per worker, one line per
    /// iteration, and a final elapsed-time line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (id, report) in self.workers.iter().enumerate() {
            let _ = writeln!(out, "**** WORKER {id} ****");
            for outcome in &report.outcomes {
                let status = if outcome.passed { "passed" } else { "FAILED" };
                let _ = writeln!(out, "test {}: {}", outcome.iteration, status);
            }
            if report.aborted {
                let _ = writeln!(
                    out,
                    "BUILD FAILED after {} completed iteration(s)",
                    report.outcomes.len()
                );
            }
        }
        let _ = writeln!(out, "testing took: {:.2}s", self.elapsed.as_secs_f64());
        out
    }

    /// Write the rendered summary to `path` (typically [`SUMMARY_FILE`]).
    pub fn write_to(&self, path: &Path) -> Result<(), RunnerError> {
        fs::write(path, self.render()).map_err(|e| RunnerError::Summary {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
