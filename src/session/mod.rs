//! Session state and operations.
//!
//! One [`Session`] lives for the whole process. It owns the active file
//! set, the sandbox policy, and (after `initialize`) the engine handle;
//! it is mutated only by the transport task, one operation at a time.
//! State transitions replace whole values — engine handle, sandbox policy
//! — rather than mutating fields piecemeal.

pub mod results;
pub mod scan;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::{CodeEngine, EngineFactory, EngineSpec, NullSink, OutputSink};
use crate::notify::{Level, Notifier, NotifierSink, StreamKind};
use crate::sandbox::{Intent, SandboxPolicy};
use crate::search;
use crate::session::results::{
    AddFilesResult, ConfigureSandboxResult, ContextFilesResult, HealthResult, InitializeResult,
    LintCmdResult, RemoveFilesResult, RepoMapResult, RunPromptResult, SearchResult,
    ShutdownResult, TestCmdResult,
};
use crate::{BridgeError, Result};

/// Editing-discipline preamble prepended to every streaming instruction.
pub const STREAMING_PREAMBLE: &str = "Apply the smallest targeted edits that satisfy the \
     request. Edit only the lines that must change; do not rewrite whole files.";

/// Tunables the session carries from configuration.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Model identifier used when `initialize` does not name one.
    pub default_model: String,
    /// Engine flag: commit completed edits automatically.
    pub auto_commits: bool,
    /// Engine flag: allow commits on a dirty working tree.
    pub dirty_commits: bool,
    /// Engine edit-format hint.
    pub edit_format: Option<String>,
    /// Bound on one search subprocess.
    pub search_timeout: Duration,
    /// Default cap on search matches.
    pub search_max_results: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_model: "gpt-4".to_owned(),
            auto_commits: true,
            dirty_commits: true,
            edit_format: None,
            search_timeout: Duration::from_secs(10),
            search_max_results: 50,
        }
    }
}

/// The one mutable session value owned by the transport loop.
pub struct Session {
    factory: Arc<dyn EngineFactory>,
    settings: SessionSettings,
    instance_id: String,
    sandbox: SandboxPolicy,
    active_files: BTreeSet<PathBuf>,
    repo_root: Option<PathBuf>,
    model: Option<String>,
    engine: Option<Box<dyn CodeEngine>>,
}

impl Session {
    /// Fresh, unconfigured session.
    #[must_use]
    pub fn new(factory: Arc<dyn EngineFactory>, settings: SessionSettings) -> Self {
        Self {
            factory,
            settings,
            instance_id: uuid::Uuid::new_v4().to_string(),
            sandbox: SandboxPolicy::open(),
            active_files: BTreeSet::new(),
            repo_root: None,
            model: None,
            engine: None,
        }
    }

    /// Whether an engine handle is currently bound.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    /// The sandbox policy currently in force.
    #[must_use]
    pub fn sandbox(&self) -> &SandboxPolicy {
        &self.sandbox
    }

    // ── Configuration operations ──────────────────────────────────────────────

    /// Install or replace the path confinement policy (last write wins).
    ///
    /// # Errors
    ///
    /// Fails when `root` does not exist on disk; the previous policy stays
    /// in force in that case.
    pub fn configure_sandbox(
        &mut self,
        root: &Path,
        read_only_paths: Vec<PathBuf>,
        branch_id: &str,
    ) -> Result<ConfigureSandboxResult> {
        if !root.exists() {
            return Err(BridgeError::Session(format!(
                "Sandbox root does not exist: {}",
                root.display()
            )));
        }

        let policy = SandboxPolicy::confined(root, &read_only_paths, branch_id)?;
        let result = ConfigureSandboxResult {
            success: true,
            sandbox_root: policy.root().map(Path::to_path_buf).unwrap_or_default(),
            read_only_files: policy.read_only_files(),
            branch_id: policy.branch_id().to_owned(),
        };

        // Whole-value swap; a half-updated policy is never observable.
        self.sandbox = policy;
        info!(
            instance_id = %self.instance_id,
            sandbox_root = %result.sandbox_root.display(),
            branch_id = %result.branch_id,
            "sandbox configured"
        );
        Ok(result)
    }

    /// Bind a fresh engine handle to `repo_path`.
    ///
    /// Re-initialization replaces the engine handle and active file set
    /// wholesale; a sandbox policy already in force stays in force.
    ///
    /// # Errors
    ///
    /// Fails when `repo_path` does not exist or the engine cannot be
    /// constructed (the collaborator's message is propagated verbatim).
    pub fn initialize(
        &mut self,
        repo_path: &Path,
        model_name: Option<String>,
    ) -> Result<InitializeResult> {
        let repo_root = repo_path.canonicalize().map_err(|_| {
            BridgeError::Session(format!(
                "Repository path does not exist: {}",
                repo_path.display()
            ))
        })?;
        if !repo_root.is_dir() {
            return Err(BridgeError::Session(format!(
                "Repository path is not a directory: {}",
                repo_path.display()
            )));
        }

        let model = model_name.unwrap_or_else(|| self.settings.default_model.clone());
        let spec = EngineSpec {
            repo_root: repo_root.clone(),
            model: model.clone(),
            auto_commits: self.settings.auto_commits,
            dirty_commits: self.settings.dirty_commits,
            edit_format: self.settings.edit_format.clone(),
        };
        let engine = self.factory.create(&spec)?;

        self.engine = Some(engine);
        self.repo_root = Some(repo_root.clone());
        self.model = Some(model.clone());
        self.active_files.clear();

        info!(
            instance_id = %self.instance_id,
            repo = %repo_root.display(),
            model = %model,
            "engine bound"
        );
        Ok(InitializeResult {
            success: true,
            repo_path: repo_root,
            model,
            files_in_context: Vec::new(),
        })
    }

    // ── File-set operations ───────────────────────────────────────────────────

    /// Union `paths` into the active file set.
    ///
    /// Each path passes the sandbox read check first. Denied paths are
    /// collected in `blocked_by_sandbox` — partial success, never a
    /// whole-call failure. Paths that validate but do not exist produce a
    /// warning notification and are skipped.
    ///
    /// # Errors
    ///
    /// Only on internal resolution failures; sandbox denials do not fail
    /// the call.
    pub fn add_files(&mut self, paths: Vec<String>, notifier: &Notifier) -> Result<AddFilesResult> {
        let mut files_added = Vec::new();
        let mut blocked_by_sandbox = Vec::new();

        for raw in paths {
            match self.sandbox.validate(Path::new(&raw), Intent::Read) {
                Ok(resolved) => {
                    if resolved.exists() {
                        self.active_files.insert(resolved.clone());
                        files_added.push(resolved);
                    } else {
                        notifier.notify(Level::Warning, &format!("File not found: {raw}"));
                    }
                }
                Err(BridgeError::Sandbox(violation)) => {
                    warn!(
                        instance_id = %self.instance_id,
                        path = %violation.path.display(),
                        "path blocked by sandbox"
                    );
                    blocked_by_sandbox.push(raw);
                }
                Err(other) => return Err(other),
            }
        }

        let warning = (!blocked_by_sandbox.is_empty())
            .then(|| format!("{} files blocked by sandbox", blocked_by_sandbox.len()));

        Ok(AddFilesResult {
            success: true,
            files_added,
            blocked_by_sandbox,
            files_in_context: self.context_files(),
            warning,
        })
    }

    /// Remove `paths` from the active file set; absent paths are no-ops.
    ///
    /// # Errors
    ///
    /// Only on internal resolution failures.
    pub fn remove_files(&mut self, paths: &[String]) -> Result<RemoveFilesResult> {
        let mut files_removed = Vec::new();

        for raw in paths {
            let candidate = Path::new(raw);
            let resolved = match self.sandbox.validate(candidate, Intent::Read) {
                Ok(resolved) => resolved,
                // A path that never passed the read check cannot be in the
                // set; report its literal form and move on.
                Err(_) => candidate.to_path_buf(),
            };
            self.active_files.remove(&resolved);
            files_removed.push(resolved);
        }

        Ok(RemoveFilesResult {
            success: true,
            files_removed,
            files_in_context: self.context_files(),
        })
    }

    /// Snapshot (copy) of the active file set.
    #[must_use]
    pub fn get_context_files(&self) -> ContextFilesResult {
        ContextFilesResult {
            success: true,
            files_in_context: self.context_files(),
        }
    }

    // ── Engine operations ─────────────────────────────────────────────────────

    /// Run one instruction, blocking until the engine returns.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Uninitialized`] without an engine handle; engine
    /// failures are propagated verbatim.
    pub async fn run_prompt(&mut self, message: &str) -> Result<RunPromptResult> {
        let mut sink = NullSink;
        self.run_with_sink(message, &mut sink).await
    }

    /// Streaming variant: same contract as [`run_prompt`](Self::run_prompt),
    /// with every engine output chunk forwarded as a `stream` token frame
    /// in emission order.
    ///
    /// Emits `start` before invocation and exactly one terminal event
    /// (`complete` or `error`) after. No stream frame is emitted when the
    /// session is uninitialized.
    ///
    /// # Errors
    ///
    /// Same as [`run_prompt`](Self::run_prompt).
    pub async fn run_prompt_streaming(
        &mut self,
        message: &str,
        notifier: &Notifier,
    ) -> Result<RunPromptResult> {
        if self.engine.is_none() {
            return Err(BridgeError::Uninitialized);
        }

        notifier.stream(StreamKind::Start, "");
        let instruction = format!("{STREAMING_PREAMBLE}\n\n{message}");
        let mut sink = NotifierSink::new(notifier.clone());

        // The sink lives only for this invocation; the next non-streaming
        // call gets a fresh one by construction.
        match self.run_with_sink(&instruction, &mut sink).await {
            Ok(result) => {
                notifier.stream(StreamKind::Complete, "");
                Ok(result)
            }
            Err(err) => {
                notifier.stream(StreamKind::Error, &err.to_string());
                Err(err)
            }
        }
    }

    async fn run_with_sink(
        &mut self,
        instruction: &str,
        sink: &mut dyn OutputSink,
    ) -> Result<RunPromptResult> {
        if self.engine.is_none() {
            return Err(BridgeError::Uninitialized);
        }
        let scan_root = self.scan_root()?;
        let files: Vec<PathBuf> = self.active_files.iter().cloned().collect();

        let before = scan::snapshot(&scan_root);
        let engine = self.engine.as_mut().ok_or(BridgeError::Uninitialized)?;
        let response = engine.run(instruction, &files, sink).await?;
        let after = scan::snapshot(&scan_root);

        let new_files: Vec<PathBuf> = after.difference(&before).cloned().collect();
        let modified_files: Vec<PathBuf> = self
            .active_files
            .iter()
            .filter(|path| !new_files.contains(path))
            .cloned()
            .collect();

        debug!(
            instance_id = %self.instance_id,
            new = new_files.len(),
            modified = modified_files.len(),
            "instruction complete"
        );
        Ok(RunPromptResult {
            success: true,
            response,
            new_files,
            modified_files,
            files_in_context: self.context_files(),
        })
    }

    /// Configure the engine's test command.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Uninitialized`] without an engine handle.
    pub fn set_test_cmd(&mut self, command: String) -> Result<TestCmdResult> {
        let engine = self.engine.as_mut().ok_or(BridgeError::Uninitialized)?;
        engine.set_test_command(&command);
        Ok(TestCmdResult {
            success: true,
            test_cmd: command,
        })
    }

    /// Configure the engine's lint command.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Uninitialized`] without an engine handle.
    pub fn set_lint_cmd(&mut self, command: String) -> Result<LintCmdResult> {
        let engine = self.engine.as_mut().ok_or(BridgeError::Uninitialized)?;
        engine.set_lint_command(&command);
        Ok(LintCmdResult {
            success: true,
            lint_cmd: command,
        })
    }

    // ── Introspection operations ──────────────────────────────────────────────

    /// Textual map of the repository: sorted relative file listing under
    /// the effective scan root.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Uninitialized`] when neither a sandbox root nor a
    /// repository root is configured.
    pub fn get_repo_map(&self) -> Result<RepoMapResult> {
        let scan_root = self.scan_root()?;
        Ok(RepoMapResult {
            success: true,
            repo_map: scan::repo_map(&scan_root),
            files_in_context: self.context_files(),
        })
    }

    /// Liveness and binding status. Never depends on the engine handle and
    /// never fails.
    #[must_use]
    pub fn health(&self) -> HealthResult {
        HealthResult {
            success: true,
            initialized: self.engine.is_some(),
            pid: std::process::id(),
            instance_id: self.instance_id.clone(),
        }
    }

    /// Release the engine handle and reset all session state. Idempotent.
    pub fn shutdown(&mut self) -> ShutdownResult {
        if self.engine.is_some() {
            info!(instance_id = %self.instance_id, "releasing engine handle");
        }
        self.engine = None;
        self.active_files.clear();
        self.repo_root = None;
        self.model = None;
        self.sandbox = SandboxPolicy::open();

        ShutdownResult {
            success: true,
            message: "Shutdown complete".to_owned(),
        }
    }

    // ── Search operations ─────────────────────────────────────────────────────

    /// Text search under `directory` (default: the effective scan root).
    ///
    /// # Errors
    ///
    /// Sandbox denial of `directory`, a missing search backend, or an
    /// exceeded subprocess bound — all reported, none fatal to the bridge.
    pub async fn search_code(
        &self,
        pattern: &str,
        directory: Option<&Path>,
        max_results: Option<usize>,
    ) -> Result<SearchResult> {
        let dir = self.resolve_search_dir(directory)?;
        let limit = max_results.unwrap_or(self.settings.search_max_results);
        search::search_code(&dir, pattern, limit, self.settings.search_timeout).await
    }

    /// Definition lookup for `symbol` under `directory` (default: the
    /// effective scan root).
    ///
    /// # Errors
    ///
    /// Same as [`search_code`](Self::search_code).
    pub async fn find_definition(
        &self,
        symbol: &str,
        language: Option<&str>,
        directory: Option<&Path>,
    ) -> Result<SearchResult> {
        let dir = self.resolve_search_dir(directory)?;
        search::find_definition(
            &dir,
            symbol,
            language,
            self.settings.search_max_results,
            self.settings.search_timeout,
        )
        .await
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    fn context_files(&self) -> Vec<PathBuf> {
        self.active_files.iter().cloned().collect()
    }

    /// The root scanned for side-effect discovery: the sandbox root when
    /// confinement is active, else the initialized repository root.
    fn scan_root(&self) -> Result<PathBuf> {
        if let Some(root) = self.sandbox.root() {
            return Ok(root.to_owned());
        }
        self.repo_root.clone().ok_or(BridgeError::Uninitialized)
    }

    fn resolve_search_dir(&self, directory: Option<&Path>) -> Result<PathBuf> {
        match directory {
            Some(dir) => {
                let resolved = self.sandbox.validate(dir, Intent::Read)?;
                if !resolved.is_dir() {
                    return Err(BridgeError::Session(format!(
                        "Search directory does not exist: {}",
                        dir.display()
                    )));
                }
                Ok(resolved)
            }
            None => {
                if let Ok(root) = self.scan_root() {
                    Ok(root)
                } else {
                    std::env::current_dir().map_err(|err| BridgeError::Io(err.to_string()))
                }
            }
        }
    }
}
