//! SUMMARY:
//! Define the errors the guard synthesizes on top of the wrapped filesystem.
//!
//! OVERVIEW:
//! `LinkGuardError` covers the outcomes that originate in guard logic rather
//! than in the operating system: broken in-root chains (`ENOENT`), escapes that
//! cannot be mapped back under a root (`EINVAL`), runaway chains (`ELOOP`) and
//! configuration values that fail to parse. Filesystem-facing operations hand
//! these out as `std::io::Error` with the matching `ErrorKind`, so existing
//! call sites that branch on `kind()` keep working unchanged.
use std::error::Error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

const MAX_ERROR_PATH_LEN: usize = 256;

// Internal helper: render error-friendly path display (truncate long values).
pub(crate) fn truncate_path_display(path: &Path, max_len: usize) -> String {
    let path_str = path.to_string_lossy();
    let char_count = path_str.chars().count();
    if char_count <= max_len {
        return path_str.into_owned();
    }
    let keep = max_len.saturating_sub(5) / 2;
    let start: String = path_str.chars().take(keep).collect();
    let mut tail_chars: Vec<char> = path_str.chars().rev().take(keep).collect();
    tail_chars.reverse();
    let end: String = tail_chars.into_iter().collect();
    format!("{start}...{end}")
}

/// The filesystem primitive a guard error is reported against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syscall {
    Lstat,
    Realpath,
    Readlink,
    Readdir,
    Opendir,
}

impl Syscall {
    pub fn as_str(self) -> &'static str {
        match self {
            Syscall::Lstat => "lstat",
            Syscall::Realpath => "realpath",
            Syscall::Readlink => "readlink",
            Syscall::Readdir => "readdir",
            Syscall::Opendir => "opendir",
        }
    }
}

impl fmt::Display for Syscall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SUMMARY:
/// Represent errors produced by guard logic and guard configuration.
///
/// VARIANTS:
/// - `NotFound`: A link chain inside a root ends on a missing target (`ENOENT`).
/// - `Unmappable`: A link escapes its root and has no equivalent path inside it (`EINVAL`).
/// - `TooManyHops`: A link chain did not terminate within the hop limit (`ELOOP`).
/// - `InvalidFlag`: A configuration flag could not be parsed as a boolean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkGuardError {
    NotFound {
        syscall: Syscall,
        path: PathBuf,
    },
    Unmappable {
        syscall: Syscall,
        path: PathBuf,
    },
    TooManyHops {
        syscall: Syscall,
        path: PathBuf,
    },
    /// FIELDS:
    /// - `name`: The variable or key that carried the flag.
    /// - `value`: The rejected raw value.
    InvalidFlag {
        name: &'static str,
        value: String,
    },
}

impl LinkGuardError {
    #[inline]
    pub(crate) fn not_found(syscall: Syscall, path: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            syscall,
            path: path.into(),
        }
    }

    #[inline]
    pub(crate) fn unmappable(syscall: Syscall, path: impl Into<PathBuf>) -> Self {
        Self::Unmappable {
            syscall,
            path: path.into(),
        }
    }

    #[inline]
    pub(crate) fn too_many_hops(syscall: Syscall, path: impl Into<PathBuf>) -> Self {
        Self::TooManyHops {
            syscall,
            path: path.into(),
        }
    }

    #[inline]
    pub(crate) fn invalid_flag(name: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidFlag {
            name,
            value: value.into(),
        }
    }

    /// POSIX-style symbolic code, as an OS error for the same syscall would carry.
    pub fn code(&self) -> &'static str {
        match self {
            LinkGuardError::NotFound { .. } => "ENOENT",
            LinkGuardError::Unmappable { .. } | LinkGuardError::InvalidFlag { .. } => "EINVAL",
            LinkGuardError::TooManyHops { .. } => "ELOOP",
        }
    }

    pub fn syscall(&self) -> Option<Syscall> {
        match self {
            LinkGuardError::NotFound { syscall, .. }
            | LinkGuardError::Unmappable { syscall, .. }
            | LinkGuardError::TooManyHops { syscall, .. } => Some(*syscall),
            LinkGuardError::InvalidFlag { .. } => None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            LinkGuardError::NotFound { path, .. }
            | LinkGuardError::Unmappable { path, .. }
            | LinkGuardError::TooManyHops { path, .. } => Some(path),
            LinkGuardError::InvalidFlag { .. } => None,
        }
    }

    /// The `io::ErrorKind` an equivalent OS failure maps to.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            LinkGuardError::NotFound { .. } => io::ErrorKind::NotFound,
            LinkGuardError::Unmappable { .. } | LinkGuardError::InvalidFlag { .. } => {
                io::ErrorKind::InvalidInput
            }
            LinkGuardError::TooManyHops { .. } => loop_error_kind(),
        }
    }

    /// SUMMARY:
    /// Recover the guard payload from an `io::Error` returned by a guarded operation.
    ///
    /// RETURNS:
    /// - `None` when the error came from the wrapped filesystem itself.
    pub fn from_io_error(err: &io::Error) -> Option<&LinkGuardError> {
        err.get_ref()?.downcast_ref::<LinkGuardError>()
    }
}

impl fmt::Display for LinkGuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let describe = |f: &mut fmt::Formatter<'_>, message: &str, syscall: &Syscall, path: &Path| {
            let shown = truncate_path_display(path, MAX_ERROR_PATH_LEN);
            write!(f, "{}: {message}, {syscall} '{shown}'", self.code())
        };
        match self {
            LinkGuardError::NotFound { syscall, path } => {
                describe(f, "no such file or directory", syscall, path)
            }
            LinkGuardError::Unmappable { syscall, path } => {
                describe(f, "invalid argument", syscall, path)
            }
            LinkGuardError::TooManyHops { syscall, path } => {
                describe(f, "too many symbolic links encountered", syscall, path)
            }
            LinkGuardError::InvalidFlag { name, value } => {
                write!(f, "Invalid boolean value for {name}: '{value}'")
            }
        }
    }
}

impl Error for LinkGuardError {}

// `ErrorKind::FilesystemLoop` cannot be named on stable; take it from the OS error.
#[cfg(unix)]
fn loop_error_kind() -> io::ErrorKind {
    io::Error::from_raw_os_error(libc::ELOOP).kind()
}

#[cfg(not(unix))]
fn loop_error_kind() -> io::ErrorKind {
    io::ErrorKind::Other
}

impl From<LinkGuardError> for io::Error {
    fn from(err: LinkGuardError) -> Self {
        io::Error::new(err.kind(), err)
    }
}
