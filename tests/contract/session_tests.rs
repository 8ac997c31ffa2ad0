//! Wire-shape contracts for session operations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use coder_bridge::notify::Notifier;
use coder_bridge::session::{Session, SessionSettings};
use coder_bridge::BridgeError;

use super::support::{self, scripted_session, FailingFactory, Script};

fn touch(path: &Path) {
    std::fs::write(path, "content").expect("write file");
}

// ─── configure_sandbox ────────────────────────────────────────────────

#[test]
fn configure_sandbox_reports_root_allowlist_and_branch() {
    let sbx = tempfile::tempdir().expect("sandbox dir");
    let mut session = scripted_session("ok");

    let result = session
        .configure_sandbox(sbx.path(), Vec::new(), "b1")
        .expect("configure succeeds");

    assert!(result.success);
    assert_eq!(result.sandbox_root, sbx.path().canonicalize().expect("root"));
    assert!(result.read_only_files.is_empty());
    assert_eq!(result.branch_id, "b1");
}

#[test]
fn configure_sandbox_missing_root_fails_and_keeps_prior_policy() {
    let sbx = tempfile::tempdir().expect("sandbox dir");
    let mut session = scripted_session("ok");
    session
        .configure_sandbox(sbx.path(), Vec::new(), "b1")
        .expect("first configure");

    let result =
        session.configure_sandbox(&PathBuf::from("/nonexistent/sbx"), Vec::new(), "b2");

    assert!(result.is_err());
    assert_eq!(session.sandbox().branch_id(), "b1");
}

#[test]
fn configure_sandbox_is_idempotent_last_write_wins() {
    let first = tempfile::tempdir().expect("first dir");
    let second = tempfile::tempdir().expect("second dir");
    let mut session = scripted_session("ok");

    session
        .configure_sandbox(first.path(), Vec::new(), "b1")
        .expect("first configure");
    let result = session
        .configure_sandbox(second.path(), Vec::new(), "b2")
        .expect("second configure");

    assert_eq!(
        result.sandbox_root,
        second.path().canonicalize().expect("root")
    );
    assert_eq!(session.sandbox().branch_id(), "b2");
}

// ─── add_files / remove_files ─────────────────────────────────────────

#[tokio::test]
async fn add_files_blocks_outside_paths_as_partial_success() {
    let sbx = tempfile::tempdir().expect("sandbox dir");
    let outside = tempfile::tempdir().expect("outside dir");
    let secret = outside.path().join("secret.txt");
    touch(&secret);

    let mut session = scripted_session("ok");
    session
        .configure_sandbox(sbx.path(), Vec::new(), "b1")
        .expect("configure");

    let (notifier, _rx) = Notifier::channel();
    let result = session
        .add_files(vec![secret.display().to_string()], &notifier)
        .expect("partial success");

    assert!(result.success);
    assert!(result.files_added.is_empty());
    assert_eq!(result.blocked_by_sandbox, vec![secret.display().to_string()]);
    assert_eq!(result.warning.as_deref(), Some("1 files blocked by sandbox"));
}

#[tokio::test]
async fn add_files_is_idempotent() {
    let sbx = tempfile::tempdir().expect("sandbox dir");
    let file = sbx.path().join("a.rs");
    touch(&file);

    let mut session = scripted_session("ok");
    session
        .configure_sandbox(sbx.path(), Vec::new(), "b1")
        .expect("configure");

    let (notifier, _rx) = Notifier::channel();
    let paths = vec![file.display().to_string()];
    let first = session
        .add_files(paths.clone(), &notifier)
        .expect("first add");
    let second = session.add_files(paths, &notifier).expect("second add");

    assert_eq!(first.files_in_context, second.files_in_context);
    assert_eq!(second.files_in_context.len(), 1);
}

#[tokio::test]
async fn remove_then_add_restores_membership() {
    let sbx = tempfile::tempdir().expect("sandbox dir");
    let file = sbx.path().join("a.rs");
    touch(&file);

    let mut session = scripted_session("ok");
    session
        .configure_sandbox(sbx.path(), Vec::new(), "b1")
        .expect("configure");

    let (notifier, _rx) = Notifier::channel();
    let paths = vec![file.display().to_string()];
    let before = session
        .add_files(paths.clone(), &notifier)
        .expect("add")
        .files_in_context;

    session.remove_files(&paths).expect("remove");
    assert!(session.get_context_files().files_in_context.is_empty());

    let after = session
        .add_files(paths, &notifier)
        .expect("re-add")
        .files_in_context;

    assert_eq!(before, after);
}

#[tokio::test]
async fn removing_an_absent_path_is_a_no_op() {
    let sbx = tempfile::tempdir().expect("sandbox dir");
    let mut session = scripted_session("ok");
    session
        .configure_sandbox(sbx.path(), Vec::new(), "b1")
        .expect("configure");

    let result = session
        .remove_files(&[sbx.path().join("never-added.rs").display().to_string()])
        .expect("no-op remove");

    assert!(result.success);
    assert_eq!(result.files_removed.len(), 1);
}

#[tokio::test]
async fn add_files_warns_about_missing_files_via_notifier() {
    let sbx = tempfile::tempdir().expect("sandbox dir");
    let mut session = scripted_session("ok");
    session
        .configure_sandbox(sbx.path(), Vec::new(), "b1")
        .expect("configure");

    let (notifier, mut rx) = Notifier::channel();
    let ghost = sbx.path().join("ghost.rs").display().to_string();
    let result = session
        .add_files(vec![ghost.clone()], &notifier)
        .expect("add succeeds");

    assert!(result.files_added.is_empty());
    assert!(result.blocked_by_sandbox.is_empty());
    assert!(result.warning.is_none());

    let frames = support::drain(&mut rx);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["method"], "notification");
    assert_eq!(frames[0]["params"]["level"], "warning");
    assert!(frames[0]["params"]["message"]
        .as_str()
        .expect("message")
        .contains("File not found"));
}

// ─── initialize / shutdown lifecycle ──────────────────────────────────

#[test]
fn initialize_missing_repo_fails() {
    let mut session = scripted_session("ok");

    let result = session.initialize(&PathBuf::from("/nonexistent/repo"), None);

    match result {
        Err(err) => assert!(err.to_string().contains("does not exist")),
        Ok(_) => panic!("initialize must fail for a missing repository"),
    }
}

#[test]
fn initialize_propagates_factory_error_verbatim() {
    let repo = tempfile::tempdir().expect("repo dir");
    let mut session = Session::new(
        Arc::new(FailingFactory {
            message: "engine exploded on startup".into(),
        }),
        SessionSettings::default(),
    );

    let err = session
        .initialize(repo.path(), None)
        .expect_err("factory failure propagates");

    assert_eq!(err.to_string(), "engine exploded on startup");
    assert!(!session.is_initialized());
}

#[test]
fn initialize_defaults_model_from_settings() {
    let repo = tempfile::tempdir().expect("repo dir");
    let mut session = scripted_session("ok");

    let result = session.initialize(repo.path(), None).expect("initialize");

    assert_eq!(result.model, "gpt-4");
    assert!(result.files_in_context.is_empty());
    assert!(session.is_initialized());
}

#[tokio::test]
async fn reinitialize_replaces_files_but_keeps_sandbox() {
    let sbx = tempfile::tempdir().expect("sandbox dir");
    let outside = tempfile::tempdir().expect("outside dir");
    let repo = tempfile::tempdir().expect("repo dir");
    let tracked = sbx.path().join("tracked.rs");
    touch(&tracked);
    let secret = outside.path().join("secret.txt");
    touch(&secret);

    let mut session = scripted_session("ok");
    session
        .configure_sandbox(sbx.path(), Vec::new(), "b1")
        .expect("configure");
    session.initialize(repo.path(), None).expect("initialize");

    let (notifier, _rx) = Notifier::channel();
    session
        .add_files(vec![tracked.display().to_string()], &notifier)
        .expect("add");

    session
        .initialize(repo.path(), Some("other-model".into()))
        .expect("re-initialize");

    // File set replaced wholesale, sandbox still in force.
    assert!(session.get_context_files().files_in_context.is_empty());
    let blocked = session
        .add_files(vec![secret.display().to_string()], &notifier)
        .expect("add outside");
    assert_eq!(blocked.blocked_by_sandbox.len(), 1);
}

#[test]
fn shutdown_twice_both_succeed() {
    let repo = tempfile::tempdir().expect("repo dir");
    let mut session = scripted_session("ok");
    session.initialize(repo.path(), None).expect("initialize");

    let first = session.shutdown();
    let second = session.shutdown();

    assert!(first.success);
    assert!(second.success);
    assert!(!session.is_initialized());
}

#[test]
fn operations_after_shutdown_report_uninitialized() {
    let repo = tempfile::tempdir().expect("repo dir");
    let mut session = scripted_session("ok");
    session.initialize(repo.path(), None).expect("initialize");
    session.shutdown();

    let err = session
        .set_test_cmd("cargo test".into())
        .expect_err("requires engine");

    assert!(matches!(err, BridgeError::Uninitialized));
}

// ─── health ───────────────────────────────────────────────────────────

#[test]
fn health_succeeds_without_initialize() {
    let session = scripted_session("ok");

    let health = session.health();

    assert!(health.success);
    assert!(!health.initialized);
    assert_eq!(health.pid, std::process::id());
    assert!(!health.instance_id.is_empty());
}

#[test]
fn health_reflects_engine_binding() {
    let repo = tempfile::tempdir().expect("repo dir");
    let mut session = scripted_session("ok");
    session.initialize(repo.path(), None).expect("initialize");

    assert!(session.health().initialized);
}

// ─── run_prompt ───────────────────────────────────────────────────────

#[tokio::test]
async fn run_prompt_before_initialize_is_uninitialized() {
    let mut session = scripted_session("ok");

    let err = session
        .run_prompt("add a comment")
        .await
        .expect_err("requires engine");

    assert!(err.to_string().contains("Not initialized"));
}

#[tokio::test]
async fn run_prompt_returns_response_and_heuristic_modified_set() {
    let repo = tempfile::tempdir().expect("repo dir");
    let tracked = repo.path().join("tracked.rs");
    touch(&tracked);

    let mut session = scripted_session("done as asked");
    session.initialize(repo.path(), None).expect("initialize");

    let (notifier, _rx) = Notifier::channel();
    session
        .add_files(vec![tracked.display().to_string()], &notifier)
        .expect("add");

    let result = session.run_prompt("tweak it").await.expect("run");

    assert_eq!(result.response, "done as asked");
    assert!(result.new_files.is_empty());
    assert_eq!(result.modified_files.len(), 1);
    assert!(result.modified_files[0].ends_with("tracked.rs"));
}

#[tokio::test]
async fn run_prompt_reports_files_created_by_the_engine() {
    let repo = tempfile::tempdir().expect("repo dir");
    let generated = repo.path().join("generated.rs");

    let mut session = support::session_with_script(Script {
        response: "created a file".into(),
        create_file: Some(generated.clone()),
        ..Script::default()
    });
    session.initialize(repo.path(), None).expect("initialize");

    let result = session.run_prompt("make a module").await.expect("run");

    assert_eq!(result.new_files.len(), 1);
    assert!(result.new_files[0].ends_with("generated.rs"));
    // Newly created files are not double-reported as modified.
    assert!(result.modified_files.is_empty());
}

#[tokio::test]
async fn run_prompt_scans_sandbox_root_when_confined() {
    let sbx = tempfile::tempdir().expect("sandbox dir");
    let repo = tempfile::tempdir().expect("repo dir");
    let generated = sbx.path().join("inside-sandbox.rs");

    let mut session = support::session_with_script(Script {
        response: "ok".into(),
        create_file: Some(generated.clone()),
        ..Script::default()
    });
    session
        .configure_sandbox(sbx.path(), Vec::new(), "b1")
        .expect("configure");
    session.initialize(repo.path(), None).expect("initialize");

    let result = session.run_prompt("go").await.expect("run");

    assert_eq!(result.new_files.len(), 1);
    assert!(result.new_files[0].ends_with("inside-sandbox.rs"));
}

#[tokio::test]
async fn engine_failure_is_propagated_verbatim() {
    let repo = tempfile::tempdir().expect("repo dir");
    let mut session = support::session_with_script(Script {
        fail_with: Some("model quota exceeded".into()),
        ..Script::default()
    });
    session.initialize(repo.path(), None).expect("initialize");

    let err = session.run_prompt("go").await.expect_err("engine fails");

    assert_eq!(err.to_string(), "model quota exceeded");
}

// ─── engine command setters ───────────────────────────────────────────

#[test]
fn command_setters_require_engine_and_echo_command() {
    let repo = tempfile::tempdir().expect("repo dir");
    let mut session = scripted_session("ok");

    assert!(matches!(
        session.set_test_cmd("pytest".into()),
        Err(BridgeError::Uninitialized)
    ));
    assert!(matches!(
        session.set_lint_cmd("ruff check".into()),
        Err(BridgeError::Uninitialized)
    ));

    session.initialize(repo.path(), None).expect("initialize");

    let test = session.set_test_cmd("pytest".into()).expect("set test cmd");
    let lint = session
        .set_lint_cmd("ruff check".into())
        .expect("set lint cmd");

    assert_eq!(test.test_cmd, "pytest");
    assert_eq!(lint.lint_cmd, "ruff check");
}

// ─── get_repo_map ─────────────────────────────────────────────────────

#[test]
fn repo_map_lists_repo_files_after_initialize() {
    let repo = tempfile::tempdir().expect("repo dir");
    touch(&repo.path().join("main.rs"));
    let mut session = scripted_session("ok");
    session.initialize(repo.path(), None).expect("initialize");

    let result = session.get_repo_map().expect("repo map");

    assert_eq!(result.repo_map, "main.rs");
}

#[test]
fn repo_map_without_any_root_is_uninitialized() {
    let session = scripted_session("ok");

    assert!(matches!(
        session.get_repo_map(),
        Err(BridgeError::Uninitialized)
    ));
}
