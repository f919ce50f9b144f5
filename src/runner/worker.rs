//! Worker: one isolated tree, M build+check iterations
//!
//! Each worker owns a full copy of the source tree for its entire lifetime
//! and is fully serial inside: build, then check, repeated a fixed number of
//! times. Outcomes flow one way over the channel; the `Finished` sentinel is
//! always the worker's last message so the collector knows when to stop
//! waiting on it.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use super::interfaces::BuildTool;
use super::Project;

/// Identifies one isolated copy and the worker bound to it (0..N-1).
pub type WorkerId = usize;

/// Build log file name, inside the worker's project directory.
pub const BUILD_LOG: &str = "raw-test-builds.output";
/// Check log file name, inside the worker's project directory.
pub const CHECK_LOG: &str = "raw-test-results.output";

/// One build+check cycle's result. Created by a worker, consumed by the
/// collector, immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationOutcome {
    pub worker: WorkerId,
    pub iteration: usize,
    pub passed: bool,
}

/// Messages a worker sends to the collector.
#[derive(Debug)]
pub enum WorkerMessage {
    /// One iteration's pass/fail, keyed by worker and iteration index.
    Outcome(IterationOutcome),
    /// The worker's build broke (or a subprocess could not be spawned). The
    /// worker records no further iterations; `Finished` still follows.
    Fatal { worker: WorkerId },
    /// Completion sentinel: this worker will send nothing more.
    Finished { worker: WorkerId },
}

/// A worker bound to one staged tree copy.
pub struct Worker {
    id: WorkerId,
    /// `{tree}/{project}` — where make runs and where the logs live
    project_dir: PathBuf,
    iterations: usize,
    tool: Arc<dyn BuildTool + Send + Sync>,
}

impl Worker {
    pub fn new(
        id: WorkerId,
        tree: &Path,
        project: Project,
        iterations: usize,
        tool: Arc<dyn BuildTool + Send + Sync>,
    ) -> Self {
        Self {
            id,
            project_dir: tree.join(project.dir_name()),
            iterations,
            tool,
        }
    }

    /// Run all iterations, reporting over `outcomes`.
    ///
    /// Never panics and never returns early without the sentinel: a build
    /// break or I/O failure is reported as `Fatal`, then `Finished` is sent
    /// so the collector's drain loop always terminates.
    pub fn run(&self, outcomes: &Sender<WorkerMessage>) {
        if let Err(e) = self.run_iterations(outcomes) {
            tracing::error!(worker = self.id, error = %e, "worker aborted");
            let _ = outcomes.send(WorkerMessage::Fatal { worker: self.id });
        }
        let _ = outcomes.send(WorkerMessage::Finished { worker: self.id });
        tracing::debug!(worker = self.id, "worker finished");
    }

    fn run_iterations(&self, outcomes: &Sender<WorkerMessage>) -> io::Result<()> {
        let build_log = self.open_log(BUILD_LOG)?;
        let check_log = self.open_log(CHECK_LOG)?;

        for iteration in 0..self.iterations {
            tracing::debug!(worker = self.id, iteration, "build");
            if !self.tool.build(&self.project_dir, &build_log)? {
                // A build break is not a flaky test: abort the whole worker.
                return Err(io::Error::other(format!(
                    "build exited nonzero on iteration {iteration}"
                )));
            }

            tracing::debug!(worker = self.id, iteration, "check");
            let passed = self.tool.check(&self.project_dir, &check_log)?;
            tracing::debug!(worker = self.id, iteration, passed, "check finished");

            let _ = outcomes.send(WorkerMessage::Outcome(IterationOutcome {
                worker: self.id,
                iteration,
                passed,
            }));
        }

        Ok(())
    }

    fn open_log(&self, name: &str) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.project_dir.join(name))
    }
}
