//! Out-of-band notification and streaming-token frames.
//!
//! Every outbound frame — responses included — flows through one
//! [`Notifier`] channel into a single writer task that owns the output
//! handle. Frame boundaries therefore cannot interleave, and channel FIFO
//! order guarantees that `stream`/`notification` frames emitted during an
//! operation precede that operation's terminal response on the wire.

use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::OutputSink;
use crate::rpc::frame;
use crate::{BridgeError, Result};

/// Notification severity levels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Non-fatal advisory.
    Warning,
    /// Failure the host should surface.
    Error,
}

impl Level {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Streaming event kinds for `run_prompt_streaming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Invocation began; emitted exactly once before any token.
    Start,
    /// One chunk of engine output, in emission order.
    Token,
    /// Terminal: the invocation succeeded.
    Complete,
    /// Terminal: the invocation failed.
    Error,
}

impl StreamKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Token => "token",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

/// Cloneable handle that serializes frames onto the shared output stream.
///
/// Sends never block; the channel is unbounded and drained by
/// [`run_writer`]. A send after the writer has gone away is logged and
/// dropped — by then the process is shutting down anyway.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Value>,
}

impl Notifier {
    /// Create a notifier and the receiver half for [`run_writer`].
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue one complete frame for the writer task.
    pub fn send_frame(&self, frame: Value) {
        if self.tx.send(frame).is_err() {
            warn!("output channel closed; dropping outbound frame");
        }
    }

    /// `ready` notification emitted once at startup.
    pub fn ready(&self) {
        self.send_frame(frame::notification("ready", json!({})));
    }

    /// Out-of-band `notification` frame.
    pub fn notify(&self, level: Level, message: &str) {
        self.send_frame(frame::notification(
            "notification",
            json!({ "level": level.as_str(), "message": message }),
        ));
    }

    /// `stream` frame for one streaming event.
    pub fn stream(&self, kind: StreamKind, content: &str) {
        self.send_frame(frame::notification(
            "stream",
            json!({
                "type": kind.as_str(),
                "content": content,
                "timestamp": timestamp(),
            }),
        ));
    }
}

/// Sink that forwards engine output as `stream` token events.
#[derive(Debug)]
pub struct NotifierSink {
    notifier: Notifier,
}

impl NotifierSink {
    /// Sink forwarding into `notifier`.
    #[must_use]
    pub fn new(notifier: Notifier) -> Self {
        Self { notifier }
    }
}

impl OutputSink for NotifierSink {
    fn emit_output(&mut self, text: &str) {
        self.notifier.stream(StreamKind::Token, text);
    }

    fn emit_error(&mut self, text: &str) {
        self.notifier.notify(Level::Error, text);
    }
}

/// Writer task — serializes frames and writes NDJSON lines to `writer`.
///
/// Runs until every [`Notifier`] clone is dropped, then drains and
/// returns, so a caller that awaits the task after dropping its handle
/// knows the output stream is flushed.
///
/// # Errors
///
/// Returns [`BridgeError::Io`] if a write fails, or
/// [`BridgeError::Protocol`] if a frame cannot be serialized (should not
/// occur for [`Value`]).
pub async fn run_writer<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<Value>) -> Result<()>
where
    W: tokio::io::AsyncWrite + Unpin + Send,
{
    while let Some(value) = rx.recv().await {
        let mut bytes = serde_json::to_vec(&value)
            .map_err(|err| BridgeError::Protocol(format!("failed to serialize frame: {err}")))?;
        bytes.push(b'\n');

        writer
            .write_all(&bytes)
            .await
            .map_err(|err| BridgeError::Io(format!("frame write failed: {err}")))?;
        writer
            .flush()
            .await
            .map_err(|err| BridgeError::Io(format!("frame flush failed: {err}")))?;
    }

    debug!("output channel drained; writer task exiting");
    Ok(())
}

/// Seconds since the Unix epoch, millisecond precision.
#[allow(clippy::cast_precision_loss)]
fn timestamp() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
