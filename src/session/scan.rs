//! Regular-file snapshots of the effective scan root.
//!
//! `run_prompt` diffs a before/after snapshot to discover files the engine
//! created outside the declared active set. The diff is a heuristic by
//! design: a file deleted and recreated with identical content is
//! indistinguishable from an untouched one.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

/// Directory names pruned from every scan: version control and dependency
/// caches.
pub const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "__pycache__",
    ".venv",
    "venv",
    "dist",
    ".idea",
];

fn is_pruned(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| EXCLUDED_DIRS.contains(&name))
}

/// Set of regular files under `root`, excluded directories pruned.
///
/// Unreadable entries are skipped; a scan never fails the operation that
/// requested it.
#[must_use]
pub fn snapshot(root: &Path) -> BTreeSet<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| !is_pruned(entry))
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(DirEntry::into_path)
        .collect()
}

/// Sorted, root-relative listing of regular files, one per line.
#[must_use]
pub fn repo_map(root: &Path) -> String {
    snapshot(root)
        .iter()
        .filter_map(|path| path.strip_prefix(root).ok())
        .map(|relative| relative.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
