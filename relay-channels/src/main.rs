//! Relay - Main entry point.

use anyhow::Result;
use relay_channels::start_relay;
use relay_common::config::Config;
use relay_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration; logging is not up yet, so report to stderr
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("relay: {e}");
            std::process::exit(e.exit_code());
        }
    };

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Relay v{}", env!("CARGO_PKG_VERSION"));

    start_relay(&config).await
}
