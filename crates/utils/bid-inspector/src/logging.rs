use std::env;
use std::str::FromStr;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub(crate) fn initialize_logging() -> anyhow::Result<()> {
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| "warn,bid_inspector=info".to_string());
    tracing_subscriber::registry()
        // Stdout carries the JSON verdicts.
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_str(&filter)?)
        .init();
    Ok(())
}
