//! End-to-end tests for the race runner
//!
//! These drive the public API with shell-backed build tools, so the real
//! subprocess spawning and append-only log capture paths are exercised
//! without needing an actual Pintos tree or `make`.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use pintos_racer::runner::interfaces::run_command;
use pintos_racer::runner::stage::stage_worktrees;
use pintos_racer::{run_races, BuildTool, Project, RaceConfig, RaceSummary, SUMMARY_FILE};

/// Build tool backed by `sh -c` scripts, run in the worker's project dir.
struct ShellTool {
    build: String,
    check: String,
}

impl BuildTool for ShellTool {
    fn build(&self, dir: &Path, log: &File) -> io::Result<bool> {
        run_command(Command::new("sh").args(["-c", &self.build]), dir, log)
    }

    fn check(&self, dir: &Path, log: &File) -> io::Result<bool> {
        run_command(Command::new("sh").args(["-c", &self.check]), dir, log)
    }
}

/// Create `{root}/src/threads` with a placeholder Makefile and return the
/// `src` path. `root` is wiped first.
fn fixture_source(name: &str) -> PathBuf {
    let root = std::env::temp_dir().join(name);
    let _ = fs::remove_dir_all(&root);
    let src = root.join("src");
    fs::create_dir_all(src.join("threads")).unwrap();
    fs::write(src.join("threads/Makefile"), "all:\n").unwrap();
    src
}

fn config(source: &Path, workers: usize, iterations: usize) -> RaceConfig {
    RaceConfig {
        source: source.to_path_buf(),
        project: Project::Threads,
        workers,
        iterations,
        scratch_dir: source.parent().unwrap().join("testing-races"),
    }
}

fn run(cfg: &RaceConfig, build: &str, check: &str) -> RaceSummary {
    let tool = Arc::new(ShellTool {
        build: build.to_string(),
        check: check.to_string(),
    });
    run_races(cfg, tool, &mut ()).unwrap()
}

#[test]
fn all_checks_pass_across_two_workers() {
    let src = fixture_source("pintos_racer_it_all_pass");
    let cfg = config(&src, 2, 3);

    let summary = run(&cfg, "echo building", "echo checking");

    assert!(summary.is_clean());
    assert_eq!(summary.workers().len(), 2);
    for (id, report) in summary.workers().iter().enumerate() {
        assert_eq!(report.outcomes.len(), 3, "worker {id}");
        assert!(report.outcomes.iter().all(|o| o.passed));
    }

    // Both staged trees exist and carry their logs.
    for id in 0..2 {
        let project_dir = cfg.scratch_dir.join(format!("src{id}")).join("threads");
        assert!(project_dir.join("Makefile").is_file());
        let builds = fs::read_to_string(project_dir.join("raw-test-builds.output")).unwrap();
        assert_eq!(builds.matches("building").count(), 3);
        let checks = fs::read_to_string(project_dir.join("raw-test-results.output")).unwrap();
        assert_eq!(checks.matches("checking").count(), 3);
    }

    let _ = fs::remove_dir_all(src.parent().unwrap());
}

#[test]
fn flaky_check_fails_once_then_passes() {
    let src = fixture_source("pintos_racer_it_flaky");
    let cfg = config(&src, 1, 2);

    // First check run leaves a marker and fails; second run sees it and passes.
    let summary = run(
        &cfg,
        "true",
        "if [ -e flaky-marker ]; then exit 0; else touch flaky-marker; exit 1; fi",
    );

    let report = &summary.workers()[0];
    assert_eq!(report.outcomes.len(), 2);
    assert!(!report.outcomes[0].passed);
    assert!(report.outcomes[1].passed);
    assert_eq!(summary.failed_iterations(), 1);
    assert!(!summary.is_clean());

    let _ = fs::remove_dir_all(src.parent().unwrap());
}

#[test]
fn build_break_aborts_the_worker() {
    let src = fixture_source("pintos_racer_it_broken");
    let cfg = config(&src, 1, 4);

    let summary = run(&cfg, "echo nope; exit 1", "true");

    let report = &summary.workers()[0];
    assert!(report.aborted);
    assert!(report.outcomes.is_empty());
    assert_eq!(summary.aborted_workers(), 1);
    assert!(!summary.is_clean());

    let _ = fs::remove_dir_all(src.parent().unwrap());
}

#[test]
fn summary_file_covers_every_worker() {
    let src = fixture_source("pintos_racer_it_summary");
    let cfg = config(&src, 3, 1);

    let summary = run(&cfg, "true", "true");
    let path = src.parent().unwrap().join(SUMMARY_FILE);
    summary.write_to(&path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    for id in 0..3 {
        assert!(text.contains(&format!("**** WORKER {id} ****")));
    }
    assert!(text.contains("testing took:"));

    let _ = fs::remove_dir_all(src.parent().unwrap());
}

#[test]
fn rerunning_restages_from_scratch() {
    let src = fixture_source("pintos_racer_it_restage");
    let cfg = config(&src, 2, 1);

    let first = run(&cfg, "true", "touch check-ran; true");
    assert!(first.is_clean());
    let marker = cfg.scratch_dir.join("src0/threads/check-ran");
    assert!(marker.is_file());

    // Second run must not see any artifact of the first.
    let trees = stage_worktrees(&cfg.source, &cfg.scratch_dir, 2).unwrap();
    assert_eq!(trees.len(), 2);
    assert!(!marker.exists());
    assert!(!trees[0].join("threads/raw-test-builds.output").exists());

    let _ = fs::remove_dir_all(src.parent().unwrap());
}
