//! CLI for the binpoll artifact poller.

mod commands;

use anyhow::Result;
use binpoll_core::config::{self, BinpollConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{run_check, run_config_path, run_targets, run_watch, WatchArgs};

/// Top-level CLI for the binpoll artifact poller.
#[derive(Debug, Parser)]
#[command(name = "binpoll")]
#[command(about = "binpoll: poll a URL and fetch the artifact when it changes", long_about = None)]
pub struct Cli {
    /// Log to stderr instead of the state-dir log file.
    #[arg(long, global = true)]
    pub stderr: bool,

    /// Config file to use instead of ~/.config/binpoll/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run a single polling cycle and report whether content was fetched.
    Check {
        /// HTTP/HTTPS URL of the artifact.
        url: String,

        /// Header compared between checks (repeatable). Defaults to ETag,
        /// If-Modified-Since, Last-Modified and Content-Length.
        #[arg(long = "check-header", value_name = "NAME")]
        check_headers: Vec<String>,

        /// Fetch even when the server sends none of the check headers.
        #[arg(long)]
        missing_headers_mean_change: bool,

        /// Install the fetched artifact here instead of discarding it.
        #[arg(long, short, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Poll a URL forever, installing each new artifact to a file.
    Watch {
        /// HTTP/HTTPS URL of the artifact.
        url: String,

        /// Where each new artifact is installed (atomically replaced).
        #[arg(long, short, value_name = "PATH")]
        output: PathBuf,

        /// Seconds between checks (default 300).
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,

        /// Header compared between checks (repeatable).
        #[arg(long = "check-header", value_name = "NAME")]
        check_headers: Vec<String>,

        /// Mark the installed file executable.
        #[arg(long)]
        executable: bool,

        /// Fetch even when the server sends none of the check headers.
        #[arg(long)]
        missing_headers_mean_change: bool,
    },

    /// Poll every target from the config file until interrupted.
    Run,

    /// Print the config file location.
    ConfigPath,
}

impl Cli {
    fn load_config(&self) -> Result<BinpollConfig> {
        match &self.config {
            Some(path) => config::load_from_path(path),
            None => config::load_or_init(),
        }
    }

    pub async fn run(self) -> Result<()> {
        if let CliCommand::ConfigPath = self.command {
            return run_config_path(self.config.as_deref());
        }

        let cfg = self.load_config()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match self.command {
            CliCommand::Check {
                url,
                check_headers,
                missing_headers_mean_change,
                output,
            } => {
                run_check(
                    &cfg,
                    WatchArgs {
                        url,
                        interval: None,
                        check_headers,
                        missing_headers_mean_change,
                        executable: false,
                    },
                    output,
                )
                .await?
            }
            CliCommand::Watch {
                url,
                output,
                interval,
                check_headers,
                executable,
                missing_headers_mean_change,
            } => {
                run_watch(
                    &cfg,
                    WatchArgs {
                        url,
                        interval,
                        check_headers,
                        missing_headers_mean_change,
                        executable,
                    },
                    output,
                )
                .await?
            }
            CliCommand::Run => run_targets(&cfg).await?,
            CliCommand::ConfigPath => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
