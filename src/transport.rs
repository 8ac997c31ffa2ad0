//! Transport loop: the read-decode-dispatch-encode-write cycle.
//!
//! One blocking read loop over the input stream, one frame per line.
//! Frames are processed strictly in arrival order, each one fully
//! (including all notifier side effects) before the next read — there is
//! no operation queue and no parallel execution. A bare sentinel line
//! triggers orderly shutdown; empty lines are ignored.

use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::notify::Notifier;
use crate::rpc::codec::FrameCodec;
use crate::rpc::dispatcher::dispatch_line;
use crate::rpc::frame::{self, PARSE_ERROR};
use crate::session::Session;
use crate::{BridgeError, Result};

/// Out-of-band control token: a bare (non-JSON) line requesting shutdown.
pub const SHUTDOWN_SENTINEL: &str = "__EXIT__";

/// Drive the transport until the sentinel, EOF, or cancellation.
///
/// Emits the `ready` notification before the first read. On every exit
/// path the session is shut down so the engine handle is released.
///
/// # Errors
///
/// Currently infallible in practice; the signature leaves room for fatal
/// transport setup failures.
pub async fn run_loop<R>(
    input: R,
    session: &mut Session,
    notifier: Notifier,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
{
    let mut frames = FramedRead::new(input, FrameCodec::new());

    notifier.ready();

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                info!("cancellation received; shutting down session");
                session.shutdown();
                break;
            }

            item = frames.next() => match item {
                None => {
                    debug!("input stream closed; shutting down session");
                    session.shutdown();
                    break;
                }

                Some(Err(BridgeError::Protocol(msg))) => {
                    // Oversized line: answer like any other unparseable
                    // frame and keep reading.
                    warn!(error = msg.as_str(), "dropping oversized input line");
                    notifier.send_frame(frame::error(
                        Value::Null,
                        PARSE_ERROR,
                        "Parse error",
                        Some(json!({ "detail": msg })),
                    ));
                }

                Some(Err(err)) => {
                    warn!(%err, "input stream error; shutting down session");
                    session.shutdown();
                    break;
                }

                Some(Ok(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if line == SHUTDOWN_SENTINEL {
                        info!("shutdown sentinel received");
                        session.shutdown();
                        break;
                    }
                    if let Some(response) = dispatch_line(session, &notifier, line).await {
                        notifier.send_frame(response);
                    }
                }
            }
        }
    }

    Ok(())
}
