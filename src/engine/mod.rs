//! Editing-engine collaborator boundary.
//!
//! The bridge treats the code-editing engine as an opaque capability: it
//! accepts a natural-language instruction plus the set of in-scope files,
//! mutates files on disk as it sees fit, and returns a text response. The
//! [`CodeEngine`] trait is the whole of that contract; the session never
//! looks behind it.
//!
//! Output is threaded through an explicit [`OutputSink`] parameter on every
//! invocation rather than swapped on the engine, so a streaming call can
//! never leave a stale sink behind for the next non-streaming call.

pub mod process;
pub mod sink;

pub use sink::{BufferSink, NullSink, OutputSink};

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::Result;

/// Boxed future alias used by the object-safe engine trait.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Construction-time description of an engine binding.
///
/// `model` is passed through to the engine **verbatim**: any
/// provider-prefixing or identifier-normalization heuristics (for example
/// mapping a bare model name onto a provider-qualified one) are the
/// responsibility of the [`EngineFactory`] implementation, never of the
/// bridge core.
#[derive(Debug, Clone)]
pub struct EngineSpec {
    /// Canonical repository root the engine operates in.
    pub repo_root: PathBuf,
    /// Model identifier, uninterpreted by the core.
    pub model: String,
    /// Commit completed edits automatically.
    pub auto_commits: bool,
    /// Allow commits when the working tree is already dirty.
    pub dirty_commits: bool,
    /// Optional edit-format hint understood by the engine.
    pub edit_format: Option<String>,
}

/// A live editing-engine handle.
///
/// One handle is bound per session at a time; it is created by
/// `initialize` and dropped by `shutdown`. Futures are boxed so the trait
/// stays object-safe behind `Box<dyn CodeEngine>`.
pub trait CodeEngine: Send {
    /// Run one instruction against the given in-scope files.
    ///
    /// Every chunk of engine output is forwarded to `sink` in emission
    /// order before the future resolves. The returned string is the
    /// engine's final response text.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Engine`](crate::BridgeError::Engine) with the
    /// collaborator's message verbatim, or
    /// [`BridgeError::Timeout`](crate::BridgeError::Timeout) if the engine
    /// enforces a bound of its own and exceeded it.
    fn run<'a>(
        &'a mut self,
        instruction: &'a str,
        files: &'a [PathBuf],
        sink: &'a mut dyn OutputSink,
    ) -> BoxFuture<'a, Result<String>>;

    /// Configure the shell command the engine runs to test its edits.
    fn set_test_command(&mut self, command: &str);

    /// Configure the shell command the engine runs to lint its edits.
    fn set_lint_command(&mut self, command: &str);
}

/// Constructs engine handles from a spec.
///
/// Injected into the session at startup so `initialize` can bind a fresh
/// handle without the session knowing which engine implementation is in
/// play.
pub trait EngineFactory: Send + Sync {
    /// Build a new engine handle bound to `spec.repo_root`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Engine`](crate::BridgeError::Engine) when the
    /// collaborator cannot be constructed; the message is surfaced to the
    /// host verbatim.
    fn create(&self, spec: &EngineSpec) -> Result<Box<dyn CodeEngine>>;
}
