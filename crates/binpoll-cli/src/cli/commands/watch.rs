//! `binpoll watch` – poll one URL until Ctrl-C.

use anyhow::{Context, Result};
use binpoll_core::config::BinpollConfig;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use super::poll::PollJob;
use super::{shared_transport, WatchArgs};

pub async fn run_watch(cfg: &BinpollConfig, args: WatchArgs, output: PathBuf) -> Result<()> {
    let job = PollJob::new(args.to_target(), shared_transport(cfg), output, args.executable)?;
    let stop = Arc::new(AtomicBool::new(false));

    let worker_stop = Arc::clone(&stop);
    thread::Builder::new()
        .name("binpoll-watch".to_string())
        .spawn(move || job.run_until(&worker_stop))
        .context("failed to start poller thread")?;

    tracing::info!(url = %args.url, "watching");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    stop.store(true, Ordering::Relaxed);
    tracing::info!("interrupted, stopping");
    Ok(())
}
