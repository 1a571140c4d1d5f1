//! Guard configuration from the environment or a config file.
use crate::error::LinkGuardError;
use crate::roots::RootSet;
use crate::Result;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::warn;

/// Path list of sandbox roots, separated like `PATH` (`:` on Unix, `;` on Windows).
pub const ROOTS_ENV: &str = "LINK_GUARD_ROOTS";
/// Boolean switch; the guard is on unless this says otherwise.
pub const ENABLED_ENV: &str = "LINK_GUARD_ENABLED";

/// SUMMARY:
/// Describe which sandbox roots to guard and whether guarding is on at all.
///
/// DETAILS:
/// Roots are kept as given; normalization and the existence filter happen in
/// [`GuardConfig::root_set`]. With the `serde` feature the struct deserializes from any
/// format with `roots` and `enabled` keys, both optional.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GuardConfig {
    pub roots: Vec<PathBuf>,
    pub enabled: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            enabled: true,
        }
    }
}

impl GuardConfig {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            enabled: true,
        }
    }

    /// SUMMARY:
    /// Read [`ROOTS_ENV`] and [`ENABLED_ENV`] from the process environment.
    ///
    /// DETAILS:
    /// Never fails. An [`ENABLED_ENV`] value that is not a boolean is logged with `warn!`
    /// and ignored, leaving the guard enabled; use [`GuardConfig::from_vars`] to reject it.
    pub fn from_env() -> Self {
        let roots = std::env::var_os(ROOTS_ENV);
        let enabled = std::env::var_os(ENABLED_ENV)
            .map(|value| value.to_string_lossy().into_owned());
        Self::from_vars_lenient(roots, enabled.as_deref())
    }

    fn from_vars_lenient(roots: Option<OsString>, enabled: Option<&str>) -> Self {
        let enabled = match enabled.map(|value| parse_flag(ENABLED_ENV, value)) {
            Some(Ok(enabled)) => enabled,
            Some(Err(err)) => {
                warn!(error = %err, "ignoring {ENABLED_ENV}; link guard stays enabled");
                true
            }
            None => true,
        };
        Self {
            enabled,
            ..Self::from_vars_roots(roots)
        }
    }

    /// SUMMARY:
    /// Build a configuration from raw variable values.
    ///
    /// PARAMETERS:
    /// - `roots`: A platform path list; empty segments are skipped. `None` means no roots.
    /// - `enabled`: `1`/`true`/`yes`/`on` or `0`/`false`/`no`/`off` (any case, surrounding
    ///   whitespace ignored). `None` means enabled.
    ///
    /// ERRORS:
    /// - `LinkGuardError::InvalidFlag`: `enabled` is set to something that is not a boolean.
    pub fn from_vars(roots: Option<OsString>, enabled: Option<&str>) -> Result<Self> {
        let enabled = match enabled {
            Some(value) => parse_flag(ENABLED_ENV, value)?,
            None => true,
        };
        Ok(Self {
            enabled,
            ..Self::from_vars_roots(roots)
        })
    }

    fn from_vars_roots(roots: Option<OsString>) -> Self {
        let roots = roots
            .map(|list| {
                std::env::split_paths(&list)
                    .filter(|root| !root.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self {
            roots,
            enabled: true,
        }
    }

    /// The effective root set: empty when disabled, otherwise the existing roots.
    pub fn root_set(&self) -> RootSet {
        if !self.enabled {
            return RootSet::default();
        }
        RootSet::new(&self.roots)
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(LinkGuardError::invalid_flag(name, value)),
    }
}
