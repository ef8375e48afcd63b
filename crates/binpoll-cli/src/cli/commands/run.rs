//! `binpoll run` – poll every configured target until Ctrl-C.

use anyhow::{Context, Result};
use binpoll_core::config::{self, BinpollConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use super::poll::PollJob;
use super::shared_transport;

pub async fn run_targets(cfg: &BinpollConfig) -> Result<()> {
    if cfg.targets.is_empty() {
        match config::config_path() {
            Ok(path) => println!("No targets configured in {}.", path.display()),
            Err(_) => println!("No targets configured."),
        }
        return Ok(());
    }

    let transport = shared_transport(cfg);
    let jobs = cfg
        .targets
        .iter()
        .map(|t| {
            PollJob::new(
                t.to_target(),
                Arc::clone(&transport),
                t.output.clone(),
                t.executable,
            )
        })
        .collect::<Result<Vec<_>>>()?;

    let stop = Arc::new(AtomicBool::new(false));
    for (i, job) in jobs.into_iter().enumerate() {
        let worker_stop = Arc::clone(&stop);
        thread::Builder::new()
            .name(format!("binpoll-{}", i))
            .spawn(move || job.run_until(&worker_stop))
            .context("failed to start poller thread")?;
    }
    tracing::info!("polling {} target(s)", cfg.targets.len());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    stop.store(true, Ordering::Relaxed);
    tracing::info!("interrupted, stopping");
    Ok(())
}
