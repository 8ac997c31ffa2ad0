use std::path::Path;

use coder_bridge::session::scan;

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create dirs");
    }
    std::fs::write(path, "content").expect("write file");
}

#[test]
fn snapshot_lists_regular_files() {
    let temp = tempfile::tempdir().expect("tempdir");
    touch(&temp.path().join("src/main.rs"));
    touch(&temp.path().join("README.md"));

    let files = scan::snapshot(temp.path());

    assert_eq!(files.len(), 2);
}

#[test]
fn snapshot_prunes_vcs_and_dependency_dirs() {
    let temp = tempfile::tempdir().expect("tempdir");
    touch(&temp.path().join("src/lib.rs"));
    touch(&temp.path().join(".git/config"));
    touch(&temp.path().join("node_modules/pkg/index.js"));
    touch(&temp.path().join("target/debug/build.log"));
    touch(&temp.path().join("__pycache__/mod.pyc"));

    let files = scan::snapshot(temp.path());

    assert_eq!(files.len(), 1);
    assert!(files.iter().next().expect("one file").ends_with("src/lib.rs"));
}

#[test]
fn snapshot_diff_detects_created_files() {
    let temp = tempfile::tempdir().expect("tempdir");
    touch(&temp.path().join("existing.rs"));

    let before = scan::snapshot(temp.path());
    touch(&temp.path().join("generated.rs"));
    let after = scan::snapshot(temp.path());

    let new: Vec<_> = after.difference(&before).collect();
    assert_eq!(new.len(), 1);
    assert!(new[0].ends_with("generated.rs"));
}

#[test]
fn repo_map_is_sorted_and_relative() {
    let temp = tempfile::tempdir().expect("tempdir");
    touch(&temp.path().join("src/b.rs"));
    touch(&temp.path().join("src/a.rs"));
    touch(&temp.path().join("Cargo.toml"));

    let map = scan::repo_map(temp.path());
    let lines: Vec<&str> = map.lines().collect();

    assert_eq!(lines, vec!["Cargo.toml", "src/a.rs", "src/b.rs"]);
}

#[test]
fn repo_map_of_empty_root_is_empty() {
    let temp = tempfile::tempdir().expect("tempdir");

    assert!(scan::repo_map(temp.path()).is_empty());
}
