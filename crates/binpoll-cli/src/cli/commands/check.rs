//! `binpoll check` – run one polling cycle.

use anyhow::Result;
use binpoll_core::config::BinpollConfig;
use binpoll_core::{storage, Fetcher};
use std::io;
use std::path::PathBuf;

use super::{shared_transport, WatchArgs};

pub async fn run_check(cfg: &BinpollConfig, args: WatchArgs, output: Option<PathBuf>) -> Result<()> {
    let transport = shared_transport(cfg);
    let target = args.to_target();

    let report = tokio::task::spawn_blocking(move || -> Result<Option<u64>> {
        let mut fetcher = Fetcher::new(target, transport);
        fetcher.init()?;
        let Some(mut artifact) = fetcher.fetch()? else {
            return Ok(None);
        };
        let bytes = match &output {
            Some(path) => storage::install(&mut artifact, path, false)?,
            None => io::copy(&mut artifact, &mut io::sink())?,
        };
        Ok(Some(bytes))
    })
    .await??;

    match report {
        Some(bytes) => println!("changed ({} bytes)", bytes),
        None => println!("unchanged"),
    }
    Ok(())
}
