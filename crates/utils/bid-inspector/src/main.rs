#![doc = include_str!("../README.md")]

mod args;
mod inspect;
mod logging;

use std::io::Write;

use clap::Parser;
use sov_auction_bridge::config::AuctionBridgeConfig;

use crate::args::Args;
use crate::inspect::{Inspector, VerdictKind};
use crate::logging::initialize_logging;

fn main() -> anyhow::Result<()> {
    initialize_logging()?;
    let args = Args::parse();

    let config = AuctionBridgeConfig::from_toml_path(&args.config)?;
    let inspector = Inspector::from_config(&config)?;

    let mut stdout = std::io::stdout().lock();
    let mut rejected = 0;
    let raw_txs = args.raw_txs()?;
    for raw_tx in &raw_txs {
        let verdict = inspector.inspect(raw_tx);
        if verdict.verdict == VerdictKind::Rejected {
            rejected += 1;
        }
        writeln!(stdout, "{}", serde_json::to_string(&verdict)?)?;
    }

    tracing::info!(total = raw_txs.len(), rejected, "Inspection finished");
    Ok(())
}
