//! Sandbox roots and the escape predicate.
//!
//! A [`RootSet`] is built once per sandbox configuration and shared read-only by every
//! guarded operation. All predicates here are pure string relations over lexically
//! normalized absolute paths; none of them touch the filesystem.
use path_absolutize::Absolutize;
use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::sync::Arc;
use tracing::debug;

/// SUMMARY:
/// Return true when `child` is `parent` or lies below it at a separator boundary.
///
/// DETAILS:
/// No normalization is performed; callers pass absolute, normalized paths. `/a/bc` is
/// not under `/a/b` even though it shares the string prefix.
pub fn is_sub_path(parent: &Path, child: &Path) -> bool {
    let parent = parent.as_os_str().as_encoded_bytes();
    let child = child.as_os_str().as_encoded_bytes();
    match child.strip_prefix(parent) {
        Some(rest) => rest.is_empty() || rest[0] == MAIN_SEPARATOR as u8,
        None => false,
    }
}

/// Resolve `path` against the current directory and fold `.`/`..` lexically.
pub(crate) fn absolute(path: &Path) -> io::Result<PathBuf> {
    Ok(path.absolutize()?.into_owned())
}

// Best-effort variant for predicates: a path that cannot be absolutized is judged as given.
fn absolute_or_raw(path: &Path) -> Cow<'_, Path> {
    path.absolutize().unwrap_or(Cow::Borrowed(path))
}

/// SUMMARY:
/// Hold the configured sandbox roots, most specific (longest) first.
///
/// DETAILS:
/// Cloning is cheap (`Arc`). An empty set disables guarding: every guarded operation
/// becomes a passthrough to the wrapped filesystem.
#[derive(Clone, PartialEq, Eq)]
pub struct RootSet {
    roots: Arc<[PathBuf]>,
}

impl RootSet {
    /// SUMMARY:
    /// Build a root set from candidate directories, dropping those that do not exist.
    ///
    /// PARAMETERS:
    /// - `candidates`: Root paths, absolute or relative to the current directory.
    ///
    /// RETURNS:
    /// - `RootSet`: Existing roots, normalized, de-duplicated and sorted longest-first.
    ///   Misconfiguration never fails; it only narrows (or disables) the guard.
    pub fn new<I, P>(candidates: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let existing = candidates.into_iter().filter_map(|candidate| {
            let candidate = candidate.as_ref();
            let root = match absolute(candidate) {
                Ok(root) => root,
                Err(err) => {
                    debug!(root = %candidate.display(), error = %err, "dropping unresolvable sandbox root");
                    return None;
                }
            };
            if root.exists() {
                Some(root)
            } else {
                debug!(root = %root.display(), "dropping missing sandbox root");
                None
            }
        });
        Self::from_normalized(existing.collect())
    }

    /// Build a root set without checking that the roots exist.
    pub fn new_unchecked<I, P>(candidates: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let roots = candidates
            .into_iter()
            .map(|candidate| absolute_or_raw(candidate.as_ref()).into_owned())
            .collect();
        Self::from_normalized(roots)
    }

    fn from_normalized(mut roots: Vec<PathBuf>) -> Self {
        roots.sort_by(|a, b| {
            b.as_os_str()
                .len()
                .cmp(&a.as_os_str().len())
                .then_with(|| a.cmp(b))
        });
        roots.dedup();
        Self {
            roots: roots.into(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Roots in evaluation order (longest first).
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.roots.iter().map(PathBuf::as_path)
    }

    /// The most specific root containing `path`, if any.
    pub fn guarding_root(&self, path: &Path) -> Option<&Path> {
        self.iter().find(|root| is_sub_path(root, path))
    }

    /// True when `path` lies under any root and therefore may need guarding.
    pub fn can_escape(&self, path: &Path) -> bool {
        self.guarding_root(path).is_some()
    }

    /// SUMMARY:
    /// Decide whether following a link from `link_path` to `link_target` leaves the
    /// root guarding `link_path`.
    ///
    /// DETAILS:
    /// Only the first root (longest-first) containing `link_path` is consulted, so a
    /// nested root shadows its ancestors: leaving the inner root while landing in the
    /// outer one is still an escape. `link_path` is normalized here; `link_target` must
    /// already be normalized.
    ///
    /// RETURNS:
    /// - `Some(root)`: The escaped root.
    /// - `None`: No escape, or `link_path` is not under any root.
    pub fn is_escape(&self, link_path: &Path, link_target: &Path) -> Option<&Path> {
        let link_path = absolute_or_raw(link_path);
        let root = self.guarding_root(&link_path)?;
        (!is_sub_path(root, link_target)).then_some(root)
    }

    /// `is_escape` evaluated against the single root `root` only.
    pub fn escapes_root(root: &Path, link_path: &Path, link_target: &Path) -> bool {
        let link_path = absolute_or_raw(link_path);
        is_sub_path(root, &link_path) && !is_sub_path(root, link_target)
    }
}

impl Default for RootSet {
    fn default() -> Self {
        Self::from_normalized(Vec::new())
    }
}

impl std::fmt::Debug for RootSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.roots.iter()).finish()
    }
}
