//! Logging init for the poller.
//!
//! Every event carries the name of the thread that emitted it. Pollers run
//! on `binpoll-<n>` / `binpoll-watch` threads and bodies stream on
//! `binpoll-get`, so interleaved targets stay readable in one log.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info,binpoll=debug,binpoll_core=debug";

/// Where the caller would like events to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    /// Append to [`log_path`], falling back to stderr.
    File,
    Stderr,
}

/// Where events actually go after [`init`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    File(PathBuf),
    Stderr,
    /// A global subscriber was already installed.
    Unchanged,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn subscriber<W>(writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .with_thread_names(true)
        .finish()
}

/// Path of the log file, `~/.local/state/binpoll/binpoll.log`.
pub fn log_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("binpoll")?;
    Ok(xdg_dirs.place_state_file("binpoll.log")?)
}

fn open_log_file() -> Result<(File, PathBuf)> {
    let path = log_path()?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    Ok((file, path))
}

/// Install the global subscriber.
///
/// An unusable log file is reported on stderr and logging continues there.
pub fn init(dest: LogDestination) -> LogOutput {
    let opened = match dest {
        LogDestination::File => Some(open_log_file()),
        LogDestination::Stderr => None,
    };
    match opened {
        Some(Ok((file, path))) => {
            if tracing::subscriber::set_global_default(subscriber(Mutex::new(file))).is_err() {
                return LogOutput::Unchanged;
            }
            tracing::info!("binpoll logging initialized at {}", path.display());
            LogOutput::File(path)
        }
        Some(Err(err)) => {
            if tracing::subscriber::set_global_default(subscriber(io::stderr)).is_err() {
                return LogOutput::Unchanged;
            }
            tracing::warn!("file logging unavailable, using stderr: {:#}", err);
            LogOutput::Stderr
        }
        None => match tracing::subscriber::set_global_default(subscriber(io::stderr)) {
            Ok(()) => LogOutput::Stderr,
            Err(_) => LogOutput::Unchanged,
        },
    }
}
