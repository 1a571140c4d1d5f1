//! Open-directory handles.
use super::DirEntry;
use std::fmt;
use std::io;

/// SUMMARY:
/// A blocking open-directory handle yielding one entry per `read()`.
///
/// DETAILS:
/// Mirrors an `opendir`/`readdir` pair: `read()` returns `Ok(None)` once the directory is
/// exhausted, and the handle also works as an `Iterator` for `for` loops and adapters.
pub struct ReadDir<'a> {
    entries: Box<dyn Iterator<Item = io::Result<DirEntry>> + Send + 'a>,
}

impl<'a> ReadDir<'a> {
    pub fn new<I>(entries: I) -> Self
    where
        I: Iterator<Item = io::Result<DirEntry>> + Send + 'a,
    {
        Self {
            entries: Box::new(entries),
        }
    }

    /// Read the next entry, `Ok(None)` at the end of the directory.
    pub fn read(&mut self) -> io::Result<Option<DirEntry>> {
        self.entries.next().transpose()
    }
}

impl Iterator for ReadDir<'_> {
    type Item = io::Result<DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }
}

impl fmt::Debug for ReadDir<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadDir").finish_non_exhaustive()
    }
}
