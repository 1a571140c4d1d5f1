//! Scratch directory trees with real symlinks.
use crate::{GuardedFs, RootSet};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub(crate) struct Layout {
    _td: TempDir,
    base: PathBuf,
}

impl Layout {
    pub(crate) fn new() -> Self {
        let td = tempfile::tempdir().unwrap();
        // Canonical so no ancestor of the tree is itself a link (macOS /var, for one).
        let base = td.path().canonicalize().unwrap();
        Self { _td: td, base }
    }

    pub(crate) fn base(&self) -> &Path {
        &self.base
    }

    pub(crate) fn path(&self, rel: &str) -> PathBuf {
        self.base.join(rel)
    }

    pub(crate) fn dir(&self, rel: &str) -> PathBuf {
        let path = self.path(rel);
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    pub(crate) fn file(&self, rel: &str) -> PathBuf {
        let path = self.path(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, rel).unwrap();
        path
    }

    /// Create `rel` as a symlink to `target`; relative targets are stored as given.
    pub(crate) fn link(&self, rel: &str, target: impl AsRef<Path>) -> PathBuf {
        let path = self.path(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::os::unix::fs::symlink(target, &path).unwrap();
        path
    }

    pub(crate) fn roots(&self, roots: &[&str]) -> RootSet {
        RootSet::new(roots.iter().map(|root| self.path(root)))
    }

    pub(crate) fn guard(&self, roots: &[&str]) -> GuardedFs {
        GuardedFs::new(self.roots(roots))
    }
}
