//! # link-guard
//!
//! Make symlinks inside a sandbox look like the files they point to, without hiding the
//! links that genuinely leave it.
//!
//! Build sandboxes are commonly populated with symlinks into a shared tree (an execroot, a
//! package store). Tools that walk the sandbox then `lstat` those links, see
//! `is_symlink() == true`, follow them, and wander out of the sandbox. `link-guard` wraps the
//! filesystem primitives such tools use (`lstat`, `realpath`, `readlink`, directory listing)
//! so that:
//!
//! - a link whose chain stays inside the root that guards it is reported as the file or
//!   directory it resolves to, with the symlink bit suppressed;
//! - a link whose first hop leaves its root is reported truthfully, as a symlink, even when
//!   its target is missing;
//! - `realpath` of a path whose true resolution leaves the root stops at the last location
//!   still inside it;
//! - anything outside every configured root is passed through untouched.
//!
//! ## Quick start
//!
//! ```rust
//! # #[cfg(unix)]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use link_guard::{FileSystem, GuardConfig, GuardedFs};
//!
//! let td = tempfile::tempdir()?;
//! let base = td.path().canonicalize()?;
//! let sandbox = base.join("sandbox");
//! let execroot = base.join("execroot");
//! std::fs::create_dir_all(sandbox.join("pkg"))?;
//! std::fs::create_dir_all(&execroot)?;
//! std::fs::write(sandbox.join("pkg/index.js"), "module.exports = 1")?;
//! std::fs::write(execroot.join("outside.js"), "")?;
//!
//! // In-root link: hidden.
//! std::os::unix::fs::symlink(sandbox.join("pkg"), sandbox.join("node_modules"))?;
//! // Escaping link: reported as a link.
//! std::os::unix::fs::symlink(execroot.join("outside.js"), sandbox.join("escape.js"))?;
//!
//! let fs = GuardedFs::from_config(&GuardConfig::new([&sandbox]));
//! assert!(fs.symlink_metadata(&sandbox.join("node_modules"))?.is_dir());
//! assert!(fs.symlink_metadata(&sandbox.join("escape.js"))?.file_type().is_symlink());
//! # Ok(()) }
//! # #[cfg(not(unix))]
//! # fn main() {}
//! ```
//!
//! ## Roots
//!
//! A [`RootSet`] holds absolute, lexically normalized root directories, longest first. A path
//! is judged only against the most specific root containing it, so nested roots act as
//! independent boundaries. Roots that do not exist are dropped; an empty set turns
//! [`GuardedFs`] into a passthrough, so misconfiguration never blocks filesystem access.
//!
//! ## Blocking and async
//!
//! [`FileSystem`] and [`AsyncFileSystem`] carry the same operations. [`GuardedFs`] implements
//! both over the same hop-walking algorithm; pick the trait that matches the caller and
//! import only that one at the call site.
//!
//! ## Errors
//!
//! Operations return `std::io::Error`. Errors synthesized by the guard carry a
//! [`LinkGuardError`] payload (POSIX-style code, syscall, path) with the matching
//! `io::ErrorKind`; errors from the wrapped filesystem pass through unchanged.
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod fs;
pub mod resolve;
pub mod roots;

// Public exports
pub use config::GuardConfig;
pub use error::{LinkGuardError, Syscall};
pub use fs::{
    AsyncFileSystem, DirEntry, DirStream, EntryKind, FileSystem, GuardedFs, HostFs, ReadDir,
};
pub use resolve::{HopOutcome, NextHop, Walk, MAX_HOPS};
pub use roots::{is_sub_path, RootSet};

/// Result type alias for this crate's non-filesystem operations.
pub type Result<T> = std::result::Result<T, LinkGuardError>;

#[cfg(test)]
mod tests;
