//! Wire-shape result structs for session operations.
//!
//! Every operation answers with an object carrying `success: true`;
//! failures never reach these types (the dispatcher shapes them from the
//! error value instead).

use std::path::PathBuf;

use serde::Serialize;

/// Result of `initialize`.
#[derive(Debug, Clone, Serialize)]
pub struct InitializeResult {
    /// Always `true` here.
    pub success: bool,
    /// Canonical repository root the engine was bound to.
    pub repo_path: PathBuf,
    /// Model identifier in effect, verbatim.
    pub model: String,
    /// Active file set after binding (empty on a fresh handle).
    pub files_in_context: Vec<PathBuf>,
}

/// Result of `configure_sandbox`.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigureSandboxResult {
    /// Always `true` here.
    pub success: bool,
    /// Canonical sandbox root now in force.
    pub sandbox_root: PathBuf,
    /// Resolved read-only allowlist.
    pub read_only_files: Vec<PathBuf>,
    /// Session label for diagnostic attribution.
    pub branch_id: String,
}

/// Result of `add_files`. Partial success is expected: blocked paths are
/// listed individually, never escalated to a whole-call failure.
#[derive(Debug, Clone, Serialize)]
pub struct AddFilesResult {
    /// Always `true` here.
    pub success: bool,
    /// Paths admitted to the active set (resolved form).
    pub files_added: Vec<PathBuf>,
    /// Paths denied by the sandbox, as the caller supplied them.
    pub blocked_by_sandbox: Vec<String>,
    /// Active file set after the call.
    pub files_in_context: Vec<PathBuf>,
    /// Present when anything was blocked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Result of `remove_files`.
#[derive(Debug, Clone, Serialize)]
pub struct RemoveFilesResult {
    /// Always `true` here.
    pub success: bool,
    /// Resolved paths the call asked to remove (absent ones included; a
    /// no-op removal is not an error).
    pub files_removed: Vec<PathBuf>,
    /// Active file set after the call.
    pub files_in_context: Vec<PathBuf>,
}

/// Result of `run_prompt` / `run_prompt_streaming`.
#[derive(Debug, Clone, Serialize)]
pub struct RunPromptResult {
    /// Always `true` here.
    pub success: bool,
    /// The engine's response text.
    pub response: String,
    /// Regular files that appeared under the scan root during the call.
    pub new_files: Vec<PathBuf>,
    /// Active files assumed touched by the call (heuristic: everything in
    /// context that was not newly created).
    pub modified_files: Vec<PathBuf>,
    /// Active file set after the call.
    pub files_in_context: Vec<PathBuf>,
}

/// Result of `get_context_files`.
#[derive(Debug, Clone, Serialize)]
pub struct ContextFilesResult {
    /// Always `true` here.
    pub success: bool,
    /// Snapshot of the active file set.
    pub files_in_context: Vec<PathBuf>,
}

/// Result of `get_repo_map`.
#[derive(Debug, Clone, Serialize)]
pub struct RepoMapResult {
    /// Always `true` here.
    pub success: bool,
    /// Sorted relative listing of regular files under the scan root.
    pub repo_map: String,
    /// Active file set at call time.
    pub files_in_context: Vec<PathBuf>,
}

/// Result of `set_test_cmd`.
#[derive(Debug, Clone, Serialize)]
pub struct TestCmdResult {
    /// Always `true` here.
    pub success: bool,
    /// Command now configured.
    pub test_cmd: String,
}

/// Result of `set_lint_cmd`.
#[derive(Debug, Clone, Serialize)]
pub struct LintCmdResult {
    /// Always `true` here.
    pub success: bool,
    /// Command now configured.
    pub lint_cmd: String,
}

/// Result of `health`. Never depends on an engine handle.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResult {
    /// Always `true` here.
    pub success: bool,
    /// Whether an engine handle is currently bound.
    pub initialized: bool,
    /// Operating-system process id.
    pub pid: u32,
    /// Per-process instance id for log correlation.
    pub instance_id: String,
}

/// Result of `shutdown`.
#[derive(Debug, Clone, Serialize)]
pub struct ShutdownResult {
    /// Always `true` here.
    pub success: bool,
    /// Human-readable confirmation.
    pub message: String,
}

/// One match from `search_code` / `find_definition`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    /// File the match was found in.
    pub file: String,
    /// 1-based line number.
    pub line: u64,
    /// Matched line text.
    pub text: String,
}

/// Result of the search operations.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Always `true` here.
    pub success: bool,
    /// Matches in backend order, capped at the configured maximum.
    pub matches: Vec<SearchMatch>,
    /// Whether the cap discarded further matches.
    pub truncated: bool,
}
