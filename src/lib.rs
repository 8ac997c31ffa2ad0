#![forbid(unsafe_code)]

//! `coder-bridge` — sandboxed code-editing sidecar.
//!
//! Exposes one stateful editing session to a host process over
//! newline-delimited JSON-RPC 2.0 on stdin/stdout. Every file-touching
//! operation passes through the [`sandbox`] policy; long-running
//! instructions can stream partial output as `stream` frames interleaved
//! with — and always preceding — their terminal response.

pub mod config;
pub mod engine;
pub mod errors;
pub mod notify;
pub mod rpc;
pub mod sandbox;
pub mod search;
pub mod session;
pub mod transport;

pub use config::BridgeConfig;
pub use errors::{BridgeError, Result};
