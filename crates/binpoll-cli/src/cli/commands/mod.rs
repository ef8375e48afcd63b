//! CLI command handlers. Each command is in its own file.

mod check;
mod config_path;
mod poll;
mod run;
mod watch;

pub use check::run_check;
pub use config_path::run_config_path;
pub use run::run_targets;
pub use watch::run_watch;

use binpoll_core::config::BinpollConfig;
use binpoll_core::{FetchTarget, SharedTransport};
use std::sync::Arc;
use std::time::Duration;

/// Target settings given on the command line.
#[derive(Debug, Clone, Default)]
pub struct WatchArgs {
    pub url: String,
    pub interval: Option<u64>,
    pub check_headers: Vec<String>,
    pub missing_headers_mean_change: bool,
    pub executable: bool,
}

impl WatchArgs {
    pub fn to_target(&self) -> FetchTarget {
        FetchTarget {
            url: self.url.clone(),
            interval: Duration::from_secs(self.interval.unwrap_or(0)),
            check_headers: self.check_headers.clone(),
            treat_missing_headers_as_change: self.missing_headers_mean_change,
        }
    }
}

/// Build the one transport shared by every fetcher in this process.
pub(crate) fn shared_transport(cfg: &BinpollConfig) -> Arc<SharedTransport> {
    Arc::new(SharedTransport::new(cfg.transport.to_options()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_args_leave_defaults_to_the_fetcher() {
        let args = WatchArgs {
            url: "https://example.com/app".to_string(),
            ..WatchArgs::default()
        };
        let target = args.to_target();
        assert!(target.interval.is_zero());
        assert!(target.check_headers.is_empty());
        assert!(!target.treat_missing_headers_as_change);
    }

    #[test]
    fn watch_args_carry_explicit_settings() {
        let args = WatchArgs {
            url: "https://example.com/app.gz".to_string(),
            interval: Some(30),
            check_headers: vec!["ETag".to_string()],
            missing_headers_mean_change: true,
            executable: true,
        };
        let target = args.to_target();
        assert_eq!(target.interval, Duration::from_secs(30));
        assert_eq!(target.check_headers, vec!["ETag".to_string()]);
        assert!(target.treat_missing_headers_as_change);
    }
}
