//! Path confinement policy and validation.
//!
//! [`SandboxPolicy`] is the sole authority for permitting file reads and
//! writes. Every file-touching session operation resolves candidate paths
//! through [`SandboxPolicy::validate`]; there is no bypass path.
//!
//! Validation canonicalizes paths, rejects `..` traversal, and detects
//! symlink-based escapes. When no sandbox root is configured the policy is
//! *open*: every path validates. When a root is configured, a path is
//! permitted if it resolves under the root, or — for read intent only — if
//! it exactly matches an entry of the read-only allowlist.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::{BridgeError, Result};

/// Access intent a candidate path is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// The caller wants to read the path.
    Read,
    /// The caller wants to create or mutate the path.
    Write,
}

/// Structured record of a confinement breach.
///
/// Carries enough context for the host to render an actionable diagnostic
/// without re-deriving session state. Serialized verbatim into failure
/// results so policy denials keep their distinct identity on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SandboxViolation {
    /// The offending path as the caller supplied it.
    pub path: PathBuf,
    /// The configured sandbox root.
    pub sandbox_root: PathBuf,
    /// The read-only allowlist; populated for read denials only.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub read_only_files: Vec<PathBuf>,
    /// Session label for diagnostic attribution.
    pub branch_id: String,
}

impl Display for SandboxViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "sandbox violation: '{}' is outside sandbox root '{}'",
            self.path.display(),
            self.sandbox_root.display()
        )
    }
}

/// Session-wide path confinement configuration.
///
/// Replaced as a whole value by `configure_sandbox`, never field-mutated.
#[derive(Debug, Clone, Default)]
pub struct SandboxPolicy {
    root: Option<PathBuf>,
    read_only: BTreeSet<PathBuf>,
    branch_id: String,
}

impl SandboxPolicy {
    /// Open policy: no confinement, every path validates.
    #[must_use]
    pub fn open() -> Self {
        Self::default()
    }

    /// Confined policy rooted at `root`.
    ///
    /// The root is canonicalized once here; allowlist entries are resolved
    /// so later exact-match comparison works against canonical paths.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] if `root` cannot be canonicalized
    /// (it does not exist or is unreadable).
    pub fn confined(root: &Path, read_only: &[PathBuf], branch_id: &str) -> Result<Self> {
        let root = root
            .canonicalize()
            .map_err(|err| BridgeError::Config(format!("sandbox root invalid: {err}")))?;

        let read_only = read_only
            .iter()
            .map(|entry| resolve_path(entry, &root))
            .collect::<Result<BTreeSet<_>>>()?;

        Ok(Self {
            root: Some(root),
            read_only,
            branch_id: branch_id.to_owned(),
        })
    }

    /// Whether a sandbox root is configured.
    #[must_use]
    pub fn is_confined(&self) -> bool {
        self.root.is_some()
    }

    /// The canonical sandbox root, if confinement is active.
    #[must_use]
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Snapshot of the read-only allowlist in sorted order.
    #[must_use]
    pub fn read_only_files(&self) -> Vec<PathBuf> {
        self.read_only.iter().cloned().collect()
    }

    /// Session label used for diagnostic attribution.
    #[must_use]
    pub fn branch_id(&self) -> &str {
        &self.branch_id
    }

    /// Validate `candidate` for the given access intent.
    ///
    /// Resolves the candidate to an absolute, symlink-resolved canonical
    /// path. With no root configured the resolved path is always permitted.
    /// With a root configured the path must be a descendant of (or equal
    /// to) the root; for [`Intent::Read`] an exact allowlist match is also
    /// accepted. Allowlist entries never satisfy a write check, even when
    /// they happen to lie under the root themselves.
    ///
    /// Pure with respect to session state: no side effects.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Sandbox`] carrying a [`SandboxViolation`] on
    /// denial, or [`BridgeError::Io`] if a relative candidate cannot be
    /// anchored (no root and no working directory).
    pub fn validate(&self, candidate: &Path, intent: Intent) -> Result<PathBuf> {
        let Some(root) = &self.root else {
            // Open mode: resolve best-effort and permit.
            let base = std::env::current_dir().map_err(|err| BridgeError::Io(err.to_string()))?;
            return resolve_path(candidate, &base);
        };

        let denied = |read_only: Vec<PathBuf>| {
            BridgeError::Sandbox(SandboxViolation {
                path: candidate.to_owned(),
                sandbox_root: root.clone(),
                read_only_files: read_only,
                branch_id: self.branch_id.clone(),
            })
        };

        // A candidate that cannot even be resolved (e.g. climbs past the
        // filesystem root) is a confinement breach, not an internal error.
        let Ok(resolved) = resolve_path(candidate, root) else {
            return Err(denied(match intent {
                Intent::Read => self.read_only_files(),
                Intent::Write => Vec::new(),
            }));
        };

        if resolved.starts_with(root) {
            return Ok(resolved);
        }

        if intent == Intent::Read && self.read_only.contains(&resolved) {
            return Ok(resolved);
        }

        Err(denied(match intent {
            Intent::Read => self.read_only_files(),
            Intent::Write => Vec::new(),
        }))
    }
}

/// Resolve `candidate` to an absolute, symlink-resolved path.
///
/// Relative candidates are anchored at `base` first, then `.` and `..`
/// components are normalized (a `..` that would climb past the filesystem
/// root is rejected). When the path exists it is canonicalized so symlink
/// targets are compared instead of link names; nonexistent paths keep
/// their normalized form.
///
/// # Errors
///
/// Returns [`BridgeError::Session`] when normalization climbs past the
/// filesystem root.
pub fn resolve_path(candidate: &Path, base: &Path) -> Result<PathBuf> {
    let anchored = if candidate.is_absolute() {
        candidate.to_owned()
    } else {
        base.join(candidate)
    };

    let mut normalized = PathBuf::new();
    for component in anchored.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping the root itself means the path walked off the
                // top of the filesystem.
                if !normalized.pop() || normalized.as_os_str().is_empty() {
                    return Err(BridgeError::Session(format!(
                        "path escapes the filesystem root: {}",
                        candidate.display()
                    )));
                }
            }
            Component::Normal(part) => normalized.push(part),
        }
    }

    // Canonicalization resolves symlinks; a link inside the sandbox that
    // points outside resolves to its target and fails the descendant check.
    // For a path that does not exist yet, canonicalize its parent so the
    // result is still comparable against the canonical root.
    match normalized.canonicalize() {
        Ok(canonical) => Ok(canonical),
        Err(_) => match (normalized.parent(), normalized.file_name()) {
            (Some(parent), Some(name)) => match parent.canonicalize() {
                Ok(parent) => Ok(parent.join(name)),
                Err(_) => Ok(normalized),
            },
            _ => Ok(normalized),
        },
    }
}
