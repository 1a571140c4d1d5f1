//! Suspension strategies for the resolver.
//!
//! The hop-walking algorithm is written once, as `async fn`s over [`Probe`]. [`Blocking`]
//! answers every probe with an already-completed future so the walk can be driven with
//! `futures::executor::block_on` from synchronous code; [`Awaiting`] forwards to an
//! [`AsyncFileSystem`] and genuinely suspends at every probe.
use crate::fs::{AsyncFileSystem, FileSystem};
use std::fs::Metadata;
use std::future::{ready, Future};
use std::io;
use std::path::{Path, PathBuf};

/// The filesystem probes the resolver issues.
pub(crate) trait Probe: Send + Sync {
    fn symlink_metadata<'a>(
        &'a self,
        path: &'a Path,
    ) -> impl Future<Output = io::Result<Metadata>> + Send + 'a;

    fn metadata<'a>(
        &'a self,
        path: &'a Path,
    ) -> impl Future<Output = io::Result<Metadata>> + Send + 'a;

    fn read_link<'a>(
        &'a self,
        path: &'a Path,
    ) -> impl Future<Output = io::Result<PathBuf>> + Send + 'a;

    fn canonicalize<'a>(
        &'a self,
        path: &'a Path,
    ) -> impl Future<Output = io::Result<PathBuf>> + Send + 'a;
}

/// Probes answered synchronously by a [`FileSystem`].
pub(crate) struct Blocking<'f, F: ?Sized>(pub(crate) &'f F);

impl<F: FileSystem + Sync + ?Sized> Probe for Blocking<'_, F> {
    fn symlink_metadata<'a>(
        &'a self,
        path: &'a Path,
    ) -> impl Future<Output = io::Result<Metadata>> + Send + 'a {
        ready(self.0.symlink_metadata(path))
    }

    fn metadata<'a>(
        &'a self,
        path: &'a Path,
    ) -> impl Future<Output = io::Result<Metadata>> + Send + 'a {
        ready(self.0.metadata(path))
    }

    fn read_link<'a>(
        &'a self,
        path: &'a Path,
    ) -> impl Future<Output = io::Result<PathBuf>> + Send + 'a {
        ready(self.0.read_link(path))
    }

    fn canonicalize<'a>(
        &'a self,
        path: &'a Path,
    ) -> impl Future<Output = io::Result<PathBuf>> + Send + 'a {
        ready(self.0.canonicalize(path))
    }
}

/// Probes awaited on an [`AsyncFileSystem`].
pub(crate) struct Awaiting<'f, F: ?Sized>(pub(crate) &'f F);

impl<F: AsyncFileSystem + ?Sized> Probe for Awaiting<'_, F> {
    fn symlink_metadata<'a>(
        &'a self,
        path: &'a Path,
    ) -> impl Future<Output = io::Result<Metadata>> + Send + 'a {
        self.0.symlink_metadata(path)
    }

    fn metadata<'a>(
        &'a self,
        path: &'a Path,
    ) -> impl Future<Output = io::Result<Metadata>> + Send + 'a {
        self.0.metadata(path)
    }

    fn read_link<'a>(
        &'a self,
        path: &'a Path,
    ) -> impl Future<Output = io::Result<PathBuf>> + Send + 'a {
        self.0.read_link(path)
    }

    fn canonicalize<'a>(
        &'a self,
        path: &'a Path,
    ) -> impl Future<Output = io::Result<PathBuf>> + Send + 'a {
        self.0.canonicalize(path)
    }
}
