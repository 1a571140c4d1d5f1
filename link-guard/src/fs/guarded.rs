//! The escape-aware decorator.
//!
//! Every operation is written once as an `async fn` over a resolver probe and then driven
//! either with `block_on` (for [`FileSystem`]) or by awaiting (for [`AsyncFileSystem`]).
use super::{AsyncFileSystem, DirEntry, DirStream, FileSystem, HostFs, ReadDir};
use crate::config::GuardConfig;
use crate::error::{LinkGuardError, Syscall};
use crate::resolve::probe::{Awaiting, Blocking, Probe};
use crate::resolve::{NextHop, Resolver, Walk};
use crate::roots::{absolute, RootSet};
use async_trait::async_trait;
use futures::executor::block_on;
use futures::StreamExt;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// SUMMARY:
/// Wrap a filesystem so symlinks resolving inside their sandbox root look like the files
/// they point to, while links escaping the root are reported truthfully.
///
/// DETAILS:
/// Construct one per sandbox configuration and hand it (or a reference) to code that needs
/// guarded access. With an empty root set every call is a plain delegation to `inner`.
/// Import either [`FileSystem`] or [`AsyncFileSystem`] at a call site; both name their
/// methods alike.
///
/// EXAMPLE:
/// ```rust
/// # #[cfg(unix)]
/// # fn main() -> std::io::Result<()> {
/// use link_guard::{FileSystem, GuardedFs, RootSet};
///
/// let td = tempfile::tempdir()?;
/// let sandbox = td.path().canonicalize()?.join("sandbox");
/// std::fs::create_dir(&sandbox)?;
/// std::fs::write(sandbox.join("real.txt"), "data")?;
/// std::os::unix::fs::symlink(sandbox.join("real.txt"), sandbox.join("alias.txt"))?;
///
/// let fs = GuardedFs::new(RootSet::new([&sandbox]));
/// let meta = fs.symlink_metadata(&sandbox.join("alias.txt"))?;
/// assert!(!meta.file_type().is_symlink());
/// assert!(meta.is_file());
/// # Ok(())
/// # }
/// # #[cfg(not(unix))]
/// # fn main() {}
/// ```
#[derive(Debug, Clone)]
pub struct GuardedFs<F = HostFs> {
    inner: F,
    roots: RootSet,
}

impl GuardedFs<HostFs> {
    /// Guard the host filesystem with `roots`.
    pub fn new(roots: RootSet) -> Self {
        Self::with_inner(HostFs, roots)
    }

    /// Guard the host filesystem as `config` describes (possibly disabled).
    pub fn from_config(config: &GuardConfig) -> Self {
        Self::new(config.root_set())
    }
}

impl<F> GuardedFs<F> {
    pub fn with_inner(inner: F, roots: RootSet) -> Self {
        if roots.is_empty() {
            debug!("no sandbox roots configured; link guard is a passthrough");
        } else {
            debug!(roots = ?roots, "link guard enabled");
        }
        Self { inner, roots }
    }

    /// SUMMARY:
    /// Borrow this filesystem with a different root set for a single call site.
    #[inline]
    pub fn with_roots(&self, roots: RootSet) -> GuardedFs<&F> {
        GuardedFs {
            inner: &self.inner,
            roots,
        }
    }

    #[inline]
    pub fn roots(&self) -> &RootSet {
        &self.roots
    }

    #[inline]
    pub fn inner(&self) -> &F {
        &self.inner
    }

    #[inline]
    pub fn into_inner(self) -> F {
        self.inner
    }

    /// False when the root set is empty and every call is delegated untouched.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        !self.roots.is_empty()
    }
}

impl<F: FileSystem + Sync> FileSystem for GuardedFs<F> {
    fn symlink_metadata(&self, path: &Path) -> io::Result<Metadata> {
        if !self.is_enabled() {
            return self.inner.symlink_metadata(path);
        }
        block_on(guarded_lstat(&self.roots, Blocking(&self.inner), path))
    }

    fn metadata(&self, path: &Path) -> io::Result<Metadata> {
        self.inner.metadata(path)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        if !self.is_enabled() {
            return self.inner.read_link(path);
        }
        block_on(guarded_readlink(&self.roots, Blocking(&self.inner), path))
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        if !self.is_enabled() {
            return self.inner.canonicalize(path);
        }
        block_on(guarded_realpath(&self.roots, Blocking(&self.inner), path))
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let entries = self.inner.read_dir(path)?;
        if !self.is_enabled() {
            return Ok(entries);
        }
        let mut resolver = Resolver::new(&self.roots, Blocking(&self.inner), Syscall::Readdir);
        entries
            .into_iter()
            .map(|entry| block_on(mask_entry(&mut resolver, entry)))
            .collect()
    }

    fn open_dir(&self, path: &Path) -> io::Result<ReadDir<'_>> {
        let entries = self.inner.open_dir(path)?;
        if !self.is_enabled() {
            return Ok(entries);
        }
        let roots = &self.roots;
        let inner = &self.inner;
        Ok(ReadDir::new(entries.map(move |entry| {
            let mut resolver = Resolver::new(roots, Blocking(inner), Syscall::Opendir);
            block_on(mask_entry(&mut resolver, entry?))
        })))
    }
}

#[async_trait]
impl<F: AsyncFileSystem> AsyncFileSystem for GuardedFs<F> {
    async fn symlink_metadata(&self, path: &Path) -> io::Result<Metadata> {
        if !self.is_enabled() {
            return self.inner.symlink_metadata(path).await;
        }
        guarded_lstat(&self.roots, Awaiting(&self.inner), path).await
    }

    async fn metadata(&self, path: &Path) -> io::Result<Metadata> {
        self.inner.metadata(path).await
    }

    async fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        if !self.is_enabled() {
            return self.inner.read_link(path).await;
        }
        guarded_readlink(&self.roots, Awaiting(&self.inner), path).await
    }

    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        if !self.is_enabled() {
            return self.inner.canonicalize(path).await;
        }
        guarded_realpath(&self.roots, Awaiting(&self.inner), path).await
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let entries = self.inner.read_dir(path).await?;
        if !self.is_enabled() {
            return Ok(entries);
        }
        let mut resolver = Resolver::new(&self.roots, Awaiting(&self.inner), Syscall::Readdir);
        let mut masked = Vec::with_capacity(entries.len());
        for entry in entries {
            masked.push(mask_entry(&mut resolver, entry).await?);
        }
        Ok(masked)
    }

    async fn open_dir<'a>(&'a self, path: &Path) -> io::Result<DirStream<'a>> {
        let entries = self.inner.open_dir(path).await?;
        if !self.is_enabled() {
            return Ok(entries);
        }
        let roots = &self.roots;
        let inner = &self.inner;
        let masked = entries.then(move |entry| async move {
            match entry {
                Ok(entry) => {
                    let mut resolver = Resolver::new(roots, Awaiting(inner), Syscall::Opendir);
                    mask_entry(&mut resolver, entry).await
                }
                Err(err) => Err(err),
            }
        });
        Ok(masked.boxed())
    }
}

/// SUMMARY:
/// `lstat` that presents in-root links as the files they transitively resolve to.
///
/// DETAILS:
/// Non-links and links outside every root come back untouched. A link whose guarded hop
/// stays in place (first hop escapes, or no hop) keeps its own symlink metadata. Otherwise
/// the whole chain is walked without the guard and the final target's metadata is returned.
/// A broken chain is an `ENOENT` unless the last link before the gap lies outside all roots.
/// A chain that loops past [`MAX_HOPS`](crate::MAX_HOPS) keeps the link's own metadata, as the
/// host `lstat` would.
async fn guarded_lstat<P: Probe>(roots: &RootSet, probe: P, path: &Path) -> io::Result<Metadata> {
    let stats = probe.symlink_metadata(path).await?;
    if !stats.file_type().is_symlink() {
        return Ok(stats);
    }
    let link = absolute(path)?;
    if !roots.can_escape(&link) {
        return Ok(stats);
    }
    let mut resolver = Resolver::new(roots, probe, Syscall::Lstat);
    let hop = resolver.guarded_read_link(&link).await?;
    if hop == link {
        return Ok(stats);
    }
    let walk = match resolver.unguarded_real_path(&link).await {
        Ok(walk) => walk,
        Err(err) if is_hop_limit(&err) => {
            trace!(link = %link.display(), "link chain loops; reporting the link itself");
            return Ok(stats);
        }
        Err(err) => return Err(err),
    };
    match walk {
        Walk::Resolved(real) => {
            trace!(link = %link.display(), target = %real.display(), "masking in-root link");
            resolver.probe().symlink_metadata(&real).await
        }
        Walk::Broken { link: last, .. } if !roots.can_escape(&last) => Ok(stats),
        Walk::Broken { .. } => Err(LinkGuardError::not_found(Syscall::Lstat, path).into()),
    }
}

/// `realpath` that stops at the root boundary when the true resolution leaves it.
async fn guarded_realpath<P: Probe>(roots: &RootSet, probe: P, path: &Path) -> io::Result<PathBuf> {
    let real = probe.canonicalize(path).await?;
    let start = absolute(path)?;
    let Some(escaped_root) = roots.is_escape(&start, &real) else {
        return Ok(real);
    };
    trace!(path = %start.display(), real = %real.display(), root = %escaped_root.display(), "realpath escapes root");
    let mut resolver = Resolver::new(roots, probe, Syscall::Realpath);
    resolver.guarded_real_path(&start, Some(escaped_root)).await
}

/// SUMMARY:
/// `readlink` that maps escaping targets back under the link's directory when it can.
///
/// RETURNS:
/// - The literal target when it does not escape the link's root.
/// - The escaping target's next hop, re-anchored under the link's directory, when that
///   path differs from the link, stays inside the escaped root and exists.
/// - Otherwise the inner `readlink` of the link's real path, which is expected to fail as
///   "not a link".
///
/// ERRORS:
/// - `ENOENT`: the escaping chain is broken.
/// - `EINVAL`: the escaping target is a plain file with no further hop to map back.
async fn guarded_readlink<P: Probe>(roots: &RootSet, probe: P, path: &Path) -> io::Result<PathBuf> {
    let target = probe.read_link(path).await?;
    let link = absolute(path)?;
    let link_dir = link.parent().unwrap_or(&link);
    let resolved = absolute(&link_dir.join(&target))?;
    let Some(escaped_root) = roots.is_escape(&link, &resolved) else {
        return Ok(target);
    };
    let mut resolver = Resolver::new(roots, probe, Syscall::Readlink);
    let next = match resolver.next_hop(&resolved).await? {
        NextHop::Broken => return Err(LinkGuardError::not_found(Syscall::Readlink, path).into()),
        NextHop::Terminal => {
            return Err(LinkGuardError::unmappable(Syscall::Readlink, path).into());
        }
        NextHop::Hop(next) => next,
    };
    let target_dir = resolved.parent().unwrap_or(&resolved);
    if let Some(relative) = pathdiff::diff_paths(&next, target_dir) {
        let mapped = absolute(&link_dir.join(relative))?;
        if mapped != link
            && !RootSet::escapes_root(escaped_root, &link, &mapped)
            && exists(resolver.probe(), &mapped).await?
        {
            trace!(link = %link.display(), mapped = %mapped.display(), "readlink remapped");
            return Ok(mapped);
        }
    }
    let real = resolver.probe().canonicalize(&link).await?;
    resolver.probe().read_link(&real).await
}

/// Re-type a symlink entry as its target when its guarded hop stays inside the root.
async fn mask_entry<P: Probe>(
    resolver: &mut Resolver<'_, P>,
    mut entry: DirEntry,
) -> io::Result<DirEntry> {
    if !entry.is_symlink() {
        return Ok(entry);
    }
    let link = absolute(entry.path())?;
    if !resolver.roots().can_escape(&link) {
        return Ok(entry);
    }
    let hop = resolver.guarded_read_link(&link).await?;
    if hop == link {
        return Ok(entry);
    }
    // A target that cannot be stat'ed (missing, looping) leaves the entry as listed.
    match resolver.probe().metadata(&hop).await {
        Ok(target) => {
            trace!(entry = %link.display(), "masking in-root directory entry");
            entry.mask_as(&target);
        }
        Err(err) => {
            trace!(
                entry = %link.display(),
                error = %err,
                "keeping unresolvable entry as a link"
            );
        }
    }
    Ok(entry)
}

async fn exists<P: Probe>(probe: &P, path: &Path) -> io::Result<bool> {
    match probe.symlink_metadata(path).await {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

fn is_hop_limit(err: &io::Error) -> bool {
    matches!(
        LinkGuardError::from_io_error(err),
        Some(LinkGuardError::TooManyHops { .. })
    )
}
