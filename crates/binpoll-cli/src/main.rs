use binpoll_core::logging::{self, LogDestination};
use clap::Parser;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init(if cli.stderr {
        LogDestination::Stderr
    } else {
        LogDestination::File
    });

    if let Err(err) = cli.run().await {
        eprintln!("binpoll error: {:#}", err);
        std::process::exit(1);
    }
}
