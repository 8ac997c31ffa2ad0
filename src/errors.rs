//! Error types shared across the bridge.

use std::fmt::{Display, Formatter};

use crate::sandbox::SandboxViolation;

/// Shared application result type.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Bridge error enumeration covering all domain failure modes.
///
/// Protocol-level variants ([`Protocol`](Self::Protocol),
/// [`Routing`](Self::Routing), [`Params`](Self::Params)) are produced and
/// consumed by the dispatcher and never reach session operations.
/// [`Sandbox`](Self::Sandbox) carries the full structured violation so
/// callers can always distinguish "blocked by policy" from "failed by
/// accident".
#[derive(Debug)]
pub enum BridgeError {
    /// Malformed inbound frame, or a result that could not be encoded.
    Protocol(String),
    /// Unknown method name; carries the name that failed to resolve.
    Routing(String),
    /// Parameter shape mismatch between the frame and the target operation.
    Params(String),
    /// Path confinement breach; the payload is reported verbatim to the host.
    Sandbox(SandboxViolation),
    /// Operation requires a live engine handle and none is bound.
    Uninitialized,
    /// The editing-engine collaborator failed; message propagated verbatim.
    Engine(String),
    /// A delegated subprocess call exceeded its time bound.
    Timeout(String),
    /// Session-level operation failure (bad argument, missing directory).
    Session(String),
    /// Configuration parsing or validation failure.
    Config(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for BridgeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Self::Routing(method) => write!(f, "Method not found: {method}"),
            Self::Params(msg) => write!(f, "Invalid params: {msg}"),
            Self::Sandbox(violation) => write!(f, "{violation}"),
            Self::Uninitialized => write!(f, "Not initialized. Call initialize() first."),
            Self::Engine(msg) => write!(f, "{msg}"),
            Self::Timeout(msg) => write!(f, "subprocess timed out: {msg}"),
            Self::Session(msg) => write!(f, "{msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for BridgeError {}

impl From<toml::de::Error> for BridgeError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
