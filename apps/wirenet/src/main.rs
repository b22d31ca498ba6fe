//! # Wirenet
//!
//! Command-line driver for the wirenet-core connection engine.
//!
//! ## Usage
//!
//! ```bash
//! wirenet init
//! wirenet place --kind small_connector --at 0,64,0
//! wirenet place --kind accumulator --at 4,64,0
//! wirenet connect --from 0,64,0 --to 4,64,0 --to-slot 5 --wire gold
//! wirenet inspect --at 4,65,0
//! wirenet remove --at 0,64,0 --spools 1
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wirenet::cli;
use wirenet::config::{LogFormat, WirenetConfig};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    let config = match WirenetConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    init_tracing(&config, cli.verbose);

    if !cli.quiet && !cli.json_mode {
        eprintln!("wirenet v{}", env!("CARGO_PKG_VERSION"));
    }

    // Execute command
    if let Err(e) = cli::execute(cli, &config) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Install the global subscriber. WIRENET_LOG_FORMAT=json enables machine-parseable output.
fn init_tracing(config: &WirenetConfig, verbose: bool) {
    let env_format = std::env::var("WIRENET_LOG_FORMAT").ok();
    let fallback = if verbose {
        "wirenet=debug"
    } else {
        config.log_filter()
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| fallback.into());

    match config.log_format(env_format.as_deref()) {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
