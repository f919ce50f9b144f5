//! Workspace staging
//!
//! Tears down and recreates the scratch directory, then produces one full
//! recursive copy of the source tree per worker. Every worker builds and
//! tests inside its own copy, so copies must be complete and independent.
//! Staging failures are fatal; a mid-sequence failure may leave a partially
//! populated scratch directory behind, which the next run's teardown removes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::interfaces::RunnerError;

/// Reset the scratch directory and stage `count` copies of `source`.
///
/// Copies land at `{scratch}/{basename}{i}` for i in 0..count, so two runs
/// with the same arguments always produce the same layout. Returns the copy
/// paths in worker order.
pub fn stage_worktrees(
    source: &Path,
    scratch: &Path,
    count: usize,
) -> Result<Vec<PathBuf>, RunnerError> {
    if scratch.exists() {
        fs::remove_dir_all(scratch).map_err(|e| {
            tracing::error!(scratch = %scratch.display(), "failed to remove old testing directory");
            RunnerError::Scratch {
                path: scratch.to_path_buf(),
                source: e,
            }
        })?;
    }
    fs::create_dir_all(scratch).map_err(|e| {
        tracing::error!(scratch = %scratch.display(), "failed to make new testing directory");
        RunnerError::Scratch {
            path: scratch.to_path_buf(),
            source: e,
        }
    })?;
    tracing::debug!(scratch = %scratch.display(), "created scratch directory");

    let base = source
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("src");

    let mut trees = Vec::with_capacity(count);
    for i in 0..count {
        let dest = scratch.join(format!("{base}{i}"));
        copy_tree(source, &dest).map_err(|e| {
            tracing::error!(dest = %dest.display(), "failed to copy source tree");
            RunnerError::Stage {
                path: dest.clone(),
                source: e,
            }
        })?;
        tracing::debug!(worker = i, dest = %dest.display(), "staged worker tree");
        trees.push(dest);
    }

    Ok(trees)
}

/// Recursively copy a directory tree.
///
/// `fs::copy` preserves permission bits, which matters for the executable
/// helper scripts in a Pintos tree. Symlinks are recreated rather than
/// followed so relative links inside the tree keep pointing within the copy.
fn copy_tree(src: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let to = dest.join(entry.file_name());
        if file_type.is_dir() {
            copy_tree(&entry.path(), &to)?;
        } else if file_type.is_symlink() {
            copy_link(&entry.path(), &to)?;
        } else {
            fs::copy(entry.path(), &to)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_link(src: &Path, dest: &Path) -> io::Result<()> {
    let target = fs::read_link(src)?;
    std::os::unix::fs::symlink(target, dest)
}

#[cfg(not(unix))]
fn copy_link(src: &Path, dest: &Path) -> io::Result<()> {
    fs::copy(src, dest).map(|_| ())
}
