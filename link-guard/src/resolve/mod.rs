//! Hop resolution: the escape-aware link-chain walk behind every guarded operation.
//!
//! A [`Resolver`] lives for exactly one top-level call (lstat, realpath, readlink, readdir)
//! and owns that call's hop cache. Link topology is assumed stable for the duration of the
//! call; nothing is cached across calls.
pub(crate) mod probe;

use crate::error::{LinkGuardError, Syscall};
use crate::roots::{absolute, RootSet};
use probe::Probe;
use std::collections::HashMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Upper bound on hops in one chain walk (Linux `MAXSYMLINKS`).
pub const MAX_HOPS: usize = 40;

/// What a single path is, as far as hop resolution cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HopOutcome {
    NonLink,
    NotFound,
    /// The link's target, absolute and lexically normalized.
    Target(PathBuf),
}

/// Result of looking for the next hop from a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextHop {
    /// The location does not exist.
    Broken,
    /// Neither the location nor any ancestor is a link: the walk is done.
    Terminal,
    Hop(PathBuf),
}

/// Result of an unguarded real-path walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Walk {
    Resolved(PathBuf),
    /// The chain ended on `missing`; `link` is the last location that pointed there.
    Broken { link: PathBuf, missing: PathBuf },
}

pub(crate) struct Resolver<'r, P> {
    roots: &'r RootSet,
    probe: P,
    syscall: Syscall,
    cache: HashMap<PathBuf, HopOutcome>,
}

impl<'r, P: Probe> Resolver<'r, P> {
    pub(crate) fn new(roots: &'r RootSet, probe: P, syscall: Syscall) -> Self {
        Self {
            roots,
            probe,
            syscall,
            cache: HashMap::new(),
        }
    }

    #[inline]
    pub(crate) fn probe(&self) -> &P {
        &self.probe
    }

    #[inline]
    pub(crate) fn roots(&self) -> &'r RootSet {
        self.roots
    }

    /// SUMMARY:
    /// Classify `path` as a non-link, a missing path, or a link with an absolute target.
    ///
    /// DETAILS:
    /// Relative targets are joined onto the link's directory and folded lexically. Every
    /// outcome is cached for the lifetime of this resolver. Errors other than "not found"
    /// come from the wrapped filesystem and propagate unchanged.
    pub(crate) async fn read_hop_link(&mut self, path: &Path) -> io::Result<HopOutcome> {
        if let Some(hit) = self.cache.get(path) {
            return Ok(hit.clone());
        }
        let outcome = match self.probe.symlink_metadata(path).await {
            Err(err) if err.kind() == io::ErrorKind::NotFound => HopOutcome::NotFound,
            Err(err) => return Err(err),
            Ok(meta) if !meta.file_type().is_symlink() => HopOutcome::NonLink,
            Ok(_) => {
                let target = self.probe.read_link(path).await?;
                let base = path.parent().unwrap_or(path);
                HopOutcome::Target(absolute(&base.join(target))?)
            }
        };
        self.cache.insert(path.to_path_buf(), outcome.clone());
        Ok(outcome)
    }

    /// SUMMARY:
    /// Find the next hop from `loc`, looking at `loc` and then each ancestor directory.
    ///
    /// DETAILS:
    /// The nearest link wins. Segments walked over on the way up are re-appended to the
    /// link's target. A hop that stays inside the root guarding `loc` is returned at once;
    /// the first escaping hop is remembered and only returned if no ancestor yields an
    /// in-root hop. The filesystem root itself is never probed.
    pub(crate) async fn next_hop(&mut self, loc: &Path) -> io::Result<NextHop> {
        let mut nested: Vec<OsString> = Vec::new();
        let mut maybe = loc.to_path_buf();
        let mut escaped_hop: Option<PathBuf> = None;
        loop {
            match self.read_hop_link(&maybe).await? {
                HopOutcome::NotFound => return Ok(NextHop::Broken),
                HopOutcome::Target(mut hop) => {
                    hop.extend(nested.iter().rev());
                    if self.roots.is_escape(loc, &hop).is_none() {
                        trace!(from = %loc.display(), to = %hop.display(), "hop");
                        return Ok(NextHop::Hop(hop));
                    }
                    trace!(from = %loc.display(), to = %hop.display(), "escaping hop");
                    escaped_hop.get_or_insert(hop);
                }
                HopOutcome::NonLink => {}
            }
            let (Some(parent), Some(name)) = (maybe.parent(), maybe.file_name()) else {
                break;
            };
            if parent.parent().is_none() {
                break;
            }
            nested.push(name.to_os_string());
            maybe = parent.to_path_buf();
        }
        Ok(escaped_hop.map_or(NextHop::Terminal, NextHop::Hop))
    }

    /// SUMMARY:
    /// Take one guarded step from `start`.
    ///
    /// RETURNS:
    /// - The hop target when the hop exists and stays inside the root guarding `start`.
    /// - `start` itself otherwise: nothing to hide, report the link truthfully.
    pub(crate) async fn guarded_read_link(&mut self, start: &Path) -> io::Result<PathBuf> {
        match self.next_hop(start).await? {
            NextHop::Hop(next) if self.roots.is_escape(start, &next).is_none() => Ok(next),
            _ => Ok(start.to_path_buf()),
        }
    }

    /// Follow every hop from `start` regardless of roots.
    pub(crate) async fn unguarded_real_path(&mut self, start: &Path) -> io::Result<Walk> {
        let mut link = start.to_path_buf();
        let mut loc = start.to_path_buf();
        for _ in 0..MAX_HOPS {
            match self.next_hop(&loc).await? {
                NextHop::Terminal => return Ok(Walk::Resolved(loc)),
                NextHop::Broken => return Ok(Walk::Broken { link, missing: loc }),
                NextHop::Hop(next) => {
                    link = std::mem::replace(&mut loc, next);
                }
            }
        }
        Err(LinkGuardError::too_many_hops(self.syscall, start).into())
    }

    /// SUMMARY:
    /// Resolve `start` up to, but not past, the last hop that stays inside its root.
    ///
    /// PARAMETERS:
    /// - `start`: Absolute path to resolve.
    /// - `escaped_root`: When given, only escapes from this root stop the walk, so a chain
    ///   that already left one root may keep hopping through a sibling root.
    ///
    /// DETAILS:
    /// At an escaping hop the walk continues into the hop's sandbox mirror when there is
    /// one (see [`Resolver::sandbox_mirror`]); otherwise it stops at the current location.
    ///
    /// ERRORS:
    /// - `NotFound`: the chain reaches a missing location.
    /// - `TooManyHops`: the chain does not settle within [`MAX_HOPS`].
    pub(crate) async fn guarded_real_path(
        &mut self,
        start: &Path,
        escaped_root: Option<&Path>,
    ) -> io::Result<PathBuf> {
        let mut loc = start.to_path_buf();
        for _ in 0..MAX_HOPS {
            let next = match self.next_hop(&loc).await? {
                NextHop::Terminal => return Ok(loc),
                NextHop::Broken => {
                    return Err(LinkGuardError::not_found(self.syscall, start).into());
                }
                NextHop::Hop(next) => next,
            };
            if !self.escapes(escaped_root, &loc, &next) {
                loc = next;
                continue;
            }
            match self.sandbox_mirror(escaped_root, &loc, &next).await? {
                Some(mirror) => {
                    trace!(from = %loc.display(), to = %mirror.display(), "mirror hop");
                    loc = mirror;
                }
                None => return Ok(loc),
            }
        }
        Err(LinkGuardError::too_many_hops(self.syscall, start).into())
    }

    /// SUMMARY:
    /// Find the in-root equivalent of an escaping hop from `loc` to `hop`.
    ///
    /// DETAILS:
    /// Sandboxes mirror their inputs as sibling symlinks into the backing tree. The mirror is
    /// the entry next to `loc` carrying `hop`'s file name, accepted only when it is itself a
    /// link whose target is exactly `hop` and it stays inside the guarding root.
    pub(crate) async fn sandbox_mirror(
        &mut self,
        escaped_root: Option<&Path>,
        loc: &Path,
        hop: &Path,
    ) -> io::Result<Option<PathBuf>> {
        let (Some(dir), Some(name)) = (loc.parent(), hop.file_name()) else {
            return Ok(None);
        };
        let mirror = dir.join(name);
        if mirror == loc || self.escapes(escaped_root, loc, &mirror) {
            return Ok(None);
        }
        match self.read_hop_link(&mirror).await? {
            HopOutcome::Target(target) if target == hop => Ok(Some(mirror)),
            _ => Ok(None),
        }
    }

    fn escapes(&self, escaped_root: Option<&Path>, from: &Path, to: &Path) -> bool {
        match escaped_root {
            Some(root) => RootSet::escapes_root(root, from, to),
            None => self.roots.is_escape(from, to).is_some(),
        }
    }
}
