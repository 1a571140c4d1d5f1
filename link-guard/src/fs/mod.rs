//! The filesystem capability the guard wraps.
//!
//! [`FileSystem`] (blocking) and [`AsyncFileSystem`] expose the same method set. The host
//! implementation, [`HostFs`], delegates to `std::fs` / `tokio::fs`; [`GuardedFs`] decorates
//! any inner implementation with escape-aware link handling. Code that needs guarded access
//! takes the trait and is handed whichever implementation the sandbox configuration calls for.
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::ffi::{OsStr, OsString};
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};

pub mod dir;
pub mod guarded;
pub mod host;

pub use dir::ReadDir;
pub use guarded::GuardedFs;
pub use host::HostFs;

/// Async counterpart of [`ReadDir`]: entries of an open directory as a stream.
pub type DirStream<'a> = BoxStream<'a, io::Result<DirEntry>>;

/// SUMMARY:
/// Blocking filesystem primitives in the shape the guard intercepts.
///
/// DETAILS:
/// Each method keeps the contract of the `std::fs` function it is named after. Relative
/// paths resolve against the current directory.
pub trait FileSystem {
    /// `lstat`: metadata of `path` itself, not following a final symlink.
    fn symlink_metadata(&self, path: &Path) -> io::Result<Metadata>;

    /// `stat`: metadata of whatever `path` resolves to.
    fn metadata(&self, path: &Path) -> io::Result<Metadata>;

    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;

    /// `realpath`.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    /// Directory entries with type information, read eagerly.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Open a directory handle whose entries are produced one at a time.
    fn open_dir(&self, path: &Path) -> io::Result<ReadDir<'_>>;
}

/// Async filesystem primitives; same contract as [`FileSystem`].
#[async_trait]
pub trait AsyncFileSystem: Send + Sync {
    async fn symlink_metadata(&self, path: &Path) -> io::Result<Metadata>;

    async fn metadata(&self, path: &Path) -> io::Result<Metadata>;

    async fn read_link(&self, path: &Path) -> io::Result<PathBuf>;

    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    async fn open_dir<'a>(&'a self, path: &Path) -> io::Result<DirStream<'a>>;
}

impl<F: FileSystem + ?Sized> FileSystem for &F {
    fn symlink_metadata(&self, path: &Path) -> io::Result<Metadata> {
        (**self).symlink_metadata(path)
    }

    fn metadata(&self, path: &Path) -> io::Result<Metadata> {
        (**self).metadata(path)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        (**self).read_link(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        (**self).canonicalize(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        (**self).read_dir(path)
    }

    fn open_dir(&self, path: &Path) -> io::Result<ReadDir<'_>> {
        (**self).open_dir(path)
    }
}

#[async_trait]
impl<F: AsyncFileSystem + ?Sized> AsyncFileSystem for &F {
    async fn symlink_metadata(&self, path: &Path) -> io::Result<Metadata> {
        (**self).symlink_metadata(path).await
    }

    async fn metadata(&self, path: &Path) -> io::Result<Metadata> {
        (**self).metadata(path).await
    }

    async fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        (**self).read_link(path).await
    }

    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        (**self).canonicalize(path).await
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        (**self).read_dir(path).await
    }

    async fn open_dir<'a>(&'a self, path: &Path) -> io::Result<DirStream<'a>> {
        (**self).open_dir(path).await
    }
}

/// File type of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Other,
}

impl From<std::fs::FileType> for EntryKind {
    fn from(file_type: std::fs::FileType) -> Self {
        if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Dir
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }
}

/// SUMMARY:
/// One directory entry with its (possibly guard-adjusted) file type.
///
/// DETAILS:
/// Unlike `std::fs::DirEntry` this is a plain value, so the guard can re-type a
/// symlink entry as the file or directory it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    path: PathBuf,
    file_name: OsString,
    kind: EntryKind,
}

impl DirEntry {
    pub fn new(dir: &Path, file_name: impl Into<OsString>, kind: EntryKind) -> Self {
        let file_name = file_name.into();
        Self {
            path: dir.join(&file_name),
            file_name,
            kind,
        }
    }

    pub(crate) fn from_std(entry: &std::fs::DirEntry) -> io::Result<Self> {
        Ok(Self {
            path: entry.path(),
            file_name: entry.file_name(),
            kind: entry.file_type()?.into(),
        })
    }

    /// Full path: the listed directory joined with the entry name.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn file_name(&self) -> &OsStr {
        &self.file_name
    }

    #[inline]
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    #[inline]
    pub fn is_symlink(&self) -> bool {
        self.kind == EntryKind::Symlink
    }

    // Present the entry as the target it resolves to; `target` comes from a following stat.
    pub(crate) fn mask_as(&mut self, target: &Metadata) {
        self.kind = target.file_type().into();
    }
}

#[cfg(test)]
mod tests;
