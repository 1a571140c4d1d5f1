//! Passthrough implementation over the host filesystem.
use super::{AsyncFileSystem, DirEntry, DirStream, FileSystem, ReadDir};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};

/// The real filesystem: `std::fs` for blocking calls, `tokio::fs` for async ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostFs;

impl FileSystem for HostFs {
    fn symlink_metadata(&self, path: &Path) -> io::Result<Metadata> {
        std::fs::symlink_metadata(path)
    }

    fn metadata(&self, path: &Path) -> io::Result<Metadata> {
        std::fs::metadata(path)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::read_link(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        std::fs::read_dir(path)?
            .map(|entry| DirEntry::from_std(&entry?))
            .collect()
    }

    fn open_dir(&self, path: &Path) -> io::Result<ReadDir<'_>> {
        let entries = std::fs::read_dir(path)?;
        Ok(ReadDir::new(
            entries.map(|entry| DirEntry::from_std(&entry?)),
        ))
    }
}

#[async_trait]
impl AsyncFileSystem for HostFs {
    async fn symlink_metadata(&self, path: &Path) -> io::Result<Metadata> {
        tokio::fs::symlink_metadata(path).await
    }

    async fn metadata(&self, path: &Path) -> io::Result<Metadata> {
        tokio::fs::metadata(path).await
    }

    async fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        tokio::fs::read_link(path).await
    }

    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        tokio::fs::canonicalize(path).await
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut listed = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let kind = entry.file_type().await?.into();
            listed.push(DirEntry::new(path, entry.file_name(), kind));
        }
        Ok(listed)
    }

    async fn open_dir<'a>(&'a self, path: &Path) -> io::Result<DirStream<'a>> {
        let entries = tokio::fs::read_dir(path).await?;
        let dir = path.to_path_buf();
        // The handle is dropped after the first error so a failing directory ends the stream.
        let stream = stream::unfold(Some(entries), move |state| {
            let dir = dir.clone();
            async move {
                let Some(mut entries) = state else {
                    return None;
                };
                let next = match entries.next_entry().await {
                    Ok(Some(entry)) => match entry.file_type().await {
                        Ok(file_type) => {
                            Ok(DirEntry::new(&dir, entry.file_name(), file_type.into()))
                        }
                        Err(err) => Err(err),
                    },
                    Ok(None) => return None,
                    Err(err) => Err(err),
                };
                let state = next.is_ok().then_some(entries);
                Some((next, state))
            }
        });
        Ok(stream.boxed())
    }
}
