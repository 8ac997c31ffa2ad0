//! Best-effort code search and definition lookup.
//!
//! Both helpers shell out to ripgrep with an explicit timeout and parse
//! its `file:line:text` output. They share no state with the session's
//! engine handle and never block the transport beyond their bound: an
//! exceeded bound is converted into a reported, non-fatal error.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::session::results::{SearchMatch, SearchResult};
use crate::{BridgeError, Result};

/// Run a ripgrep text search for `pattern` under `dir`.
///
/// # Errors
///
/// [`BridgeError::Session`] when the backend is unavailable or rejects
/// the pattern; [`BridgeError::Timeout`] when `bound` is exceeded.
pub async fn search_code(
    dir: &Path,
    pattern: &str,
    limit: usize,
    bound: Duration,
) -> Result<SearchResult> {
    let mut cmd = Command::new("rg");
    cmd.arg("--line-number")
        .arg("--no-heading")
        .arg("--color")
        .arg("never")
        .arg("--smart-case")
        .arg("--")
        .arg(pattern)
        .arg(dir);

    let output = run_bounded(cmd, bound).await?;
    Ok(collect_matches(&output, limit))
}

/// Look up likely definition sites for `symbol` under `dir`.
///
/// Builds a language-aware declaration pattern around the escaped symbol
/// and delegates to ripgrep.
///
/// # Errors
///
/// Same as [`search_code`].
pub async fn find_definition(
    dir: &Path,
    symbol: &str,
    language: Option<&str>,
    limit: usize,
    bound: Duration,
) -> Result<SearchResult> {
    let pattern = definition_pattern(symbol, language);
    let mut cmd = Command::new("rg");
    cmd.arg("--line-number")
        .arg("--no-heading")
        .arg("--color")
        .arg("never")
        .arg("--")
        .arg(&pattern)
        .arg(dir);

    let output = run_bounded(cmd, bound).await?;
    Ok(collect_matches(&output, limit))
}

/// Declaration-site regex for `symbol`, specialized by language.
#[must_use]
pub fn definition_pattern(symbol: &str, language: Option<&str>) -> String {
    let escaped = regex::escape(symbol);
    match language {
        Some("rust") => {
            format!(r"(fn|struct|enum|trait|type|const|static|mod)\s+{escaped}\b")
        }
        Some("python") => format!(r"(def|class)\s+{escaped}\b"),
        Some("javascript" | "typescript") => {
            format!(r"(function|class|const|let|var)\s+{escaped}\b")
        }
        Some("go") => format!(r"(func|type|var|const)\s+{escaped}\b"),
        _ => format!(r"(fn|def|class|function|struct|trait|type|func)\s+{escaped}\b"),
    }
}

/// Parse ripgrep `file:line:text` output into matches, capped at `limit`.
#[must_use]
pub fn collect_matches(output: &str, limit: usize) -> SearchResult {
    let mut matches = Vec::new();
    let mut truncated = false;

    for line in output.lines() {
        if matches.len() == limit {
            truncated = true;
            break;
        }
        let mut parts = line.splitn(3, ':');
        let (Some(file), Some(line_no), Some(text)) = (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        let Ok(line_no) = line_no.parse::<u64>() else {
            continue;
        };
        matches.push(SearchMatch {
            file: file.to_owned(),
            line: line_no,
            text: text.to_owned(),
        });
    }

    SearchResult {
        success: true,
        matches,
        truncated,
    }
}

/// Spawn `cmd` and collect stdout within `bound`.
///
/// Exit status 1 from ripgrep means "no matches" and yields empty output;
/// any other non-zero status is a backend failure.
async fn run_bounded(mut cmd: Command, bound: Duration) -> Result<String> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|err| BridgeError::Session(format!("search backend unavailable: {err}")))?;

    let output = tokio::time::timeout(bound, child.wait_with_output())
        .await
        .map_err(|_| BridgeError::Timeout(format!("search exceeded {}s", bound.as_secs())))?
        .map_err(|err| BridgeError::Io(format!("search backend failed: {err}")))?;

    match output.status.code() {
        Some(0 | 1) => {
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            debug!(bytes = stdout.len(), "search backend returned");
            Ok(stdout)
        }
        _ => Err(BridgeError::Session(format!(
            "search backend error: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ))),
    }
}
