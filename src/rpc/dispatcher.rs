//! Method routing and frame-level error policy.
//!
//! The dispatcher owns the fixed operation registry: every method name
//! resolves to a [`Method`] variant with a declared parameter-name list
//! and a strongly-typed argument struct, so only the name lookup itself is
//! dynamic. Per inbound frame it produces at most one terminal response:
//!
//! - malformed JSON → `-32700`, structurally invalid frame → `-32600`,
//!   unknown method → `-32601`, argument mismatch → `-32602`;
//! - operation-level failures become `success: false` **results** (the
//!   transport stays alive across arbitrarily bad outcomes);
//! - frames without a correlation id are invoked for their side effects
//!   and never answered, even on error.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::notify::Notifier;
use crate::rpc::frame::{
    self, Request, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
    PROTOCOL_VERSION,
};
use crate::rpc::params::Params;
use crate::session::Session;
use crate::{BridgeError, Result};

// ── Operation registry ────────────────────────────────────────────────────────

/// The fixed set of operations the bridge exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Bind an engine to a repository.
    Initialize,
    /// Install or replace the path confinement policy.
    ConfigureSandbox,
    /// Add files to the editing context.
    AddFiles,
    /// Remove files from the editing context.
    RemoveFiles,
    /// Run one instruction, blocking.
    RunPrompt,
    /// Run one instruction with token streaming.
    RunPromptStreaming,
    /// Snapshot of the active file set.
    GetContextFiles,
    /// Textual map of the repository.
    GetRepoMap,
    /// Configure the engine's test command.
    SetTestCmd,
    /// Configure the engine's lint command.
    SetLintCmd,
    /// Text search under the scan root.
    SearchCode,
    /// Symbol definition lookup.
    FindDefinition,
    /// Liveness and binding status.
    Health,
    /// Release the engine and reset the session.
    Shutdown,
}

impl Method {
    /// Resolve a wire method name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "initialize" => Some(Self::Initialize),
            "configure_sandbox" => Some(Self::ConfigureSandbox),
            "add_files" => Some(Self::AddFiles),
            "remove_files" => Some(Self::RemoveFiles),
            "run_prompt" => Some(Self::RunPrompt),
            "run_prompt_streaming" => Some(Self::RunPromptStreaming),
            "get_context_files" => Some(Self::GetContextFiles),
            "get_repo_map" => Some(Self::GetRepoMap),
            "set_test_cmd" => Some(Self::SetTestCmd),
            "set_lint_cmd" => Some(Self::SetLintCmd),
            "search_code" => Some(Self::SearchCode),
            "find_definition" => Some(Self::FindDefinition),
            "health" => Some(Self::Health),
            "shutdown" => Some(Self::Shutdown),
            _ => None,
        }
    }

    /// Wire name of this method.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::ConfigureSandbox => "configure_sandbox",
            Self::AddFiles => "add_files",
            Self::RemoveFiles => "remove_files",
            Self::RunPrompt => "run_prompt",
            Self::RunPromptStreaming => "run_prompt_streaming",
            Self::GetContextFiles => "get_context_files",
            Self::GetRepoMap => "get_repo_map",
            Self::SetTestCmd => "set_test_cmd",
            Self::SetLintCmd => "set_lint_cmd",
            Self::SearchCode => "search_code",
            Self::FindDefinition => "find_definition",
            Self::Health => "health",
            Self::Shutdown => "shutdown",
        }
    }

    /// Declared parameter names, in positional-binding order.
    #[must_use]
    pub const fn param_names(self) -> &'static [&'static str] {
        match self {
            Self::Initialize => &["repo_path", "model_name"],
            Self::ConfigureSandbox => &["root", "read_only_paths", "branch_id"],
            Self::AddFiles | Self::RemoveFiles => &["paths"],
            Self::RunPrompt | Self::RunPromptStreaming => &["message"],
            Self::SetTestCmd | Self::SetLintCmd => &["command"],
            Self::SearchCode => &["pattern", "directory", "max_results"],
            Self::FindDefinition => &["symbol", "language", "directory"],
            Self::GetContextFiles | Self::GetRepoMap | Self::Health | Self::Shutdown => &[],
        }
    }
}

// ── Typed argument structs ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct InitializeArgs {
    repo_path: PathBuf,
    #[serde(default)]
    model_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConfigureSandboxArgs {
    root: PathBuf,
    #[serde(default)]
    read_only_paths: Vec<PathBuf>,
    #[serde(default)]
    branch_id: String,
}

#[derive(Debug, Deserialize)]
struct PathsArgs {
    paths: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PromptArgs {
    message: String,
}

#[derive(Debug, Deserialize)]
struct CommandArgs {
    command: String,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    pattern: String,
    #[serde(default)]
    directory: Option<PathBuf>,
    #[serde(default)]
    max_results: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct DefinitionArgs {
    symbol: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    directory: Option<PathBuf>,
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

/// Process one inbound line through parse → route → bind → invoke.
///
/// Returns the terminal response frame, or `None` when the frame was a
/// notification (no correlation id) and therefore must not be answered.
pub async fn dispatch_line(
    session: &mut Session,
    notifier: &Notifier,
    line: &str,
) -> Option<Value> {
    let raw: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(err) => {
            return Some(frame::error(
                Value::Null,
                PARSE_ERROR,
                "Parse error",
                Some(json!({ "detail": err.to_string() })),
            ));
        }
    };

    let request: Request = match serde_json::from_value(raw.clone()) {
        Ok(request) => request,
        Err(err) => {
            return Some(frame::error(
                frame::recover_id(&raw),
                INVALID_REQUEST,
                "Invalid Request",
                Some(json!({ "detail": err.to_string() })),
            ));
        }
    };

    let id = request.correlation_id();

    if request.jsonrpc.as_deref() != Some(PROTOCOL_VERSION) {
        return invalid_request(id, "missing or wrong protocol version tag");
    }

    let Some(method_name) = request.method else {
        return invalid_request(id, "missing method");
    };

    let Some(method) = Method::from_name(&method_name) else {
        let err = BridgeError::Routing(method_name.clone());
        return respond_or_swallow(id, &method_name, Err(err));
    };

    let outcome = invoke(session, notifier, method, request.params).await;
    respond_or_swallow(id, method.name(), outcome)
}

/// Route a bound method invocation into the session.
async fn invoke(
    session: &mut Session,
    notifier: &Notifier,
    method: Method,
    raw_params: Option<Value>,
) -> Result<Value> {
    let params = Params::from_value(raw_params)?;
    let names = method.param_names();

    match method {
        Method::Initialize => {
            let args: InitializeArgs = params.bind(names)?;
            encode(session.initialize(&args.repo_path, args.model_name)?)
        }
        Method::ConfigureSandbox => {
            let args: ConfigureSandboxArgs = params.bind(names)?;
            encode(session.configure_sandbox(&args.root, args.read_only_paths, &args.branch_id)?)
        }
        Method::AddFiles => {
            let args: PathsArgs = params.bind(names)?;
            encode(session.add_files(args.paths, notifier)?)
        }
        Method::RemoveFiles => {
            let args: PathsArgs = params.bind(names)?;
            encode(session.remove_files(&args.paths)?)
        }
        Method::RunPrompt => {
            let args: PromptArgs = params.bind(names)?;
            encode(session.run_prompt(&args.message).await?)
        }
        Method::RunPromptStreaming => {
            let args: PromptArgs = params.bind(names)?;
            encode(session.run_prompt_streaming(&args.message, notifier).await?)
        }
        Method::GetContextFiles => {
            params.expect_empty()?;
            encode(session.get_context_files())
        }
        Method::GetRepoMap => {
            params.expect_empty()?;
            encode(session.get_repo_map()?)
        }
        Method::SetTestCmd => {
            let args: CommandArgs = params.bind(names)?;
            encode(session.set_test_cmd(args.command)?)
        }
        Method::SetLintCmd => {
            let args: CommandArgs = params.bind(names)?;
            encode(session.set_lint_cmd(args.command)?)
        }
        Method::SearchCode => {
            let args: SearchArgs = params.bind(names)?;
            encode(
                session
                    .search_code(&args.pattern, args.directory.as_deref(), args.max_results)
                    .await?,
            )
        }
        Method::FindDefinition => {
            let args: DefinitionArgs = params.bind(names)?;
            encode(
                session
                    .find_definition(
                        &args.symbol,
                        args.language.as_deref(),
                        args.directory.as_deref(),
                    )
                    .await?,
            )
        }
        Method::Health => {
            params.expect_empty()?;
            encode(session.health())
        }
        Method::Shutdown => {
            params.expect_empty()?;
            encode(session.shutdown())
        }
    }
}

// ── Response shaping ──────────────────────────────────────────────────────────

/// Map an invocation outcome onto at most one response frame.
///
/// Protocol-level errors become JSON-RPC error frames; operation-level
/// errors become `success: false` results. Without an id nothing is
/// emitted and errors are logged at WARN.
fn respond_or_swallow(
    id: Option<Value>,
    method_name: &str,
    outcome: Result<Value>,
) -> Option<Value> {
    let Some(id) = id else {
        match outcome {
            Ok(_) => debug!(method = method_name, "notification call complete"),
            Err(err) => warn!(
                method = method_name,
                %err,
                "error in fire-and-forget notification; no frame to attach it to"
            ),
        }
        return None;
    };

    Some(match outcome {
        Ok(result) => frame::success(id, result),
        Err(err) => match &err {
            BridgeError::Params(_) => frame::error(id, INVALID_PARAMS, err.to_string(), None),
            BridgeError::Routing(_) => frame::error(id, METHOD_NOT_FOUND, err.to_string(), None),
            BridgeError::Protocol(detail) => frame::error(
                id,
                INTERNAL_ERROR,
                "Internal error",
                Some(json!({ "detail": detail })),
            ),
            _ => frame::success(id, failure_body(&err)),
        },
    })
}

/// Structured `success: false` result for operation-level failures.
///
/// Sandbox violations keep their full payload so the host can tell
/// "blocked by policy" apart from "failed by accident".
#[must_use]
pub fn failure_body(err: &BridgeError) -> Value {
    let mut body = json!({ "success": false, "error": err.to_string() });
    if let BridgeError::Sandbox(violation) = err {
        if let Ok(payload) = serde_json::to_value(violation) {
            body["violation"] = payload;
        }
    }
    body
}

/// `-32600` when the frame expects an answer; swallowed otherwise.
fn invalid_request(id: Option<Value>, detail: &str) -> Option<Value> {
    match id {
        Some(id) => Some(frame::error(
            id,
            INVALID_REQUEST,
            "Invalid Request",
            Some(json!({ "detail": detail })),
        )),
        None => {
            warn!(detail, "dropping structurally invalid notification frame");
            None
        }
    }
}

fn encode<T: Serialize>(result: T) -> Result<Value> {
    serde_json::to_value(result)
        .map_err(|err| BridgeError::Protocol(format!("failed to encode result: {err}")))
}
