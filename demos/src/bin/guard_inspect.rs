//! Show what a guarded filesystem reports next to what the host reports.
//!
//! ```text
//! guard-inspect --root /tmp/sandbox lstat /tmp/sandbox/node_modules/pkg
//! LINK_GUARD_ROOTS=/tmp/sandbox guard-inspect readdir /tmp/sandbox
//! RUST_LOG=link_guard=trace guard-inspect --root /tmp/sandbox realpath /tmp/sandbox/link
//! ```
use anyhow::Context;
use clap::{Parser, Subcommand};
use link_guard::{FileSystem, GuardConfig, GuardedFs, HostFs, LinkGuardError};
use std::collections::HashMap;
use std::fmt::Display;
use std::fs::Metadata;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Sandbox root to guard; repeatable. Defaults to LINK_GUARD_ROOTS.
    #[arg(long = "root", short = 'r', value_name = "DIR", global = true)]
    roots: Vec<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Metadata without following the final link.
    Lstat { path: PathBuf },
    /// Fully resolved path.
    Realpath { path: PathBuf },
    /// Target of a symlink.
    Readlink { path: PathBuf },
    /// Directory entries with their file types.
    Readdir { path: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = if cli.roots.is_empty() {
        GuardConfig::from_env()
    } else {
        GuardConfig::new(cli.roots)
    };
    let guarded = GuardedFs::from_config(&config);
    if !guarded.is_enabled() {
        tracing::warn!("no existing sandbox roots; guarded results equal host results");
    }

    match cli.command {
        Command::Lstat { path } => compare(
            "lstat",
            guarded.symlink_metadata(&path),
            HostFs.symlink_metadata(&path),
            describe,
        ),
        Command::Realpath { path } => compare(
            "realpath",
            guarded.canonicalize(&path),
            HostFs.canonicalize(&path),
            |p| p.display().to_string(),
        ),
        Command::Readlink { path } => compare(
            "readlink",
            guarded.read_link(&path),
            HostFs.read_link(&path),
            |p| p.display().to_string(),
        ),
        Command::Readdir { path } => {
            let host: HashMap<_, _> = HostFs
                .read_dir(&path)
                .with_context(|| format!("listing {}", path.display()))?
                .into_iter()
                .map(|entry| (entry.file_name().to_os_string(), entry.kind()))
                .collect();
            let mut masked = guarded
                .read_dir(&path)
                .with_context(|| format!("listing {} through the guard", path.display()))?;
            masked.sort_by(|a, b| a.file_name().cmp(b.file_name()));
            for entry in masked {
                let host_kind = host.get(entry.file_name()).copied();
                // '*' marks entries the guard re-typed.
                let marker = if host_kind == Some(entry.kind()) { ' ' } else { '*' };
                println!(
                    "{marker} {:<32} guarded={:<8} host={}",
                    entry.file_name().to_string_lossy(),
                    format!("{:?}", entry.kind()),
                    host_kind.map_or_else(|| "-".to_string(), |kind| format!("{kind:?}")),
                );
            }
        }
    }
    Ok(())
}

fn compare<T, D: Display>(
    op: &str,
    guarded: io::Result<T>,
    host: io::Result<T>,
    show: impl Fn(&T) -> D,
) {
    println!("{op} (guarded): {}", render(&guarded, &show));
    println!("{op} (host):    {}", render(&host, &show));
}

fn render<T, D: Display>(result: &io::Result<T>, show: &impl Fn(&T) -> D) -> String {
    match result {
        Ok(value) => show(value).to_string(),
        Err(err) => match LinkGuardError::from_io_error(err) {
            Some(guard) => format!("error [{}] {guard}", guard.code()),
            None => format!("error {err}"),
        },
    }
}

fn describe(meta: &Metadata) -> String {
    let file_type = meta.file_type();
    let kind = if file_type.is_symlink() {
        "symlink"
    } else if file_type.is_dir() {
        "directory"
    } else if file_type.is_file() {
        "file"
    } else {
        "other"
    };
    format!("{kind}, {} bytes", meta.len())
}
