//! ffbwheeld - force-feedback wheel controller daemon

#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use ffbwheel_service::{Args, run};
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| args.log_filter().into()))
        .with(tracing_subscriber::fmt::layer().with_thread_names(true))
        .init();

    info!("Starting ffbwheeld v{}", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("ffbwheeld")
        .build()?;

    let result = runtime.block_on(run(
        &args,
        BufReader::new(tokio::io::stdin()),
        async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Error waiting for Ctrl+C: {e}");
            }
        },
    ));

    // stdin reads park a blocking thread that never returns on its own
    runtime.shutdown_timeout(Duration::from_millis(250));
    result.map(|_| ())
}
