#![forbid(unsafe_code)]

//! `coder-bridge` — sandboxed code-editing sidecar binary.
//!
//! Bootstraps configuration and logging, wires the subprocess engine
//! factory into a fresh session, and drives the stdio transport loop
//! until the shutdown sentinel, EOF, or a termination signal.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use coder_bridge::config::BridgeConfig;
use coder_bridge::engine::process::ProcessEngineFactory;
use coder_bridge::notify::{self, Notifier};
use coder_bridge::session::Session;
use coder_bridge::transport;
use coder_bridge::{BridgeError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "coder-bridge", about = "Sandboxed code-editing sidecar", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the configured default model identifier.
    #[arg(long)]
    model: Option<String>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| BridgeError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let mut config = BridgeConfig::load(args.config.as_deref())?;
    if let Some(model) = args.model {
        config.default_model = model;
    }

    let factory = Arc::new(ProcessEngineFactory::new(config.process_engine_config()));
    let mut session = Session::new(factory, config.session_settings());

    // One channel carries every outbound frame; the writer task owns
    // stdout so frame boundaries cannot interleave with anything else.
    let (notifier, frame_rx) = Notifier::channel();
    let writer_handle = tokio::spawn(notify::run_writer(tokio::io::stdout(), frame_rx));

    let ct = CancellationToken::new();
    let signal_ct = ct.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_ct.cancel();
    });

    // Human-readable readiness marker on the diagnostic channel; the
    // `ready` frame goes out on the primary stream from the loop itself.
    info!(pid = std::process::id(), "coder-bridge ready");

    transport::run_loop(tokio::io::stdin(), &mut session, notifier.clone(), ct).await?;

    // Dropping the last notifier handle lets the writer drain and exit.
    drop(notifier);
    match writer_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(%err, "writer task failed"),
        Err(err) => error!(%err, "writer task panicked"),
    }

    info!("coder-bridge shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

/// Initialize tracing on **stderr** — stdout belongs to the frame stream.
fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| BridgeError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| BridgeError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
