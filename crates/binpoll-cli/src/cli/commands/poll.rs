//! Blocking poll loop shared by `watch` and `run`.

use anyhow::{Context, Result};
use binpoll_core::storage;
use binpoll_core::{FetchTarget, Fetcher, SharedTransport};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One polled URL and where its artifacts go.
pub(crate) struct PollJob {
    fetcher: Fetcher,
    output: PathBuf,
    executable: bool,
}

impl PollJob {
    pub(crate) fn new(
        target: FetchTarget,
        transport: Arc<SharedTransport>,
        output: PathBuf,
        executable: bool,
    ) -> Result<Self> {
        let url = target.url.clone();
        let mut fetcher = Fetcher::new(target, transport);
        fetcher
            .init()
            .with_context(|| format!("invalid target {:?}", url))?;
        Ok(Self {
            fetcher,
            output,
            executable,
        })
    }

    pub(crate) fn url(&self) -> &str {
        &self.fetcher.target().url
    }

    /// One polling cycle. Returns the installed size when a new artifact arrived.
    ///
    /// If the artifact cannot be installed, the fetcher's header baseline is
    /// reset so the next cycle downloads it again.
    pub(crate) fn cycle(&mut self) -> Result<Option<u64>> {
        let Some(mut artifact) = self.fetcher.fetch()? else {
            return Ok(None);
        };
        match storage::install(&mut artifact, &self.output, self.executable) {
            Ok(n) => Ok(Some(n)),
            Err(e) => {
                self.fetcher.init()?;
                Err(e)
            }
        }
    }

    /// Poll until `stop` is set. Cycle errors are logged and polling continues.
    pub(crate) fn run_until(mut self, stop: &AtomicBool) {
        while !stop.load(Ordering::Relaxed) {
            match self.cycle() {
                Ok(Some(bytes)) => {
                    println!(
                        "{}: installed {} bytes to {}",
                        self.url(),
                        bytes,
                        self.output.display()
                    );
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(url = self.url(), "poll cycle failed: {:#}", e),
            }
        }
        tracing::debug!(url = self.url(), "poller stopped");
    }
}
