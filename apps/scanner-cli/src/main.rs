//! # Scanner CLI
//!
//! Command-line front end for the offline-resilient scanner client.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Parse arguments (clap)                                              │
//! │  2. Initialize tracing (RUST_LOG, default info)                         │
//! │  3. Load scanner.toml + SCANNER_* overrides                             │
//! │  4. Open SQLite store + HTTP gateway (ScannerAgent::open)               │
//! │  5. Run the command                                                     │
//! │  6. Stop background loops                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cli;
mod commands;
mod emitter;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use scanner_sync::{ScannerAgent, ScannerConfig};

use crate::cli::Cli;
use crate::emitter::TracingEmitter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ScannerConfig::load(cli.config.clone()).context("loading scanner config")?;
    debug!(device_id = config.device_id(), "Configuration loaded");

    let agent = match ScannerAgent::open_with_emitter(config, Arc::new(TracingEmitter)).await {
        Ok(agent) => agent,
        Err(e) if e.is_config_error() => anyhow::bail!("scanner.toml: {e}"),
        Err(e) => return Err(anyhow::Error::new(e).context("opening scanner store")),
    };

    let result = commands::run(&agent, cli.command).await;
    agent.shutdown().await;
    result
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=scanner_sync=trace` - Trace the sync crate only
/// - Default: INFO (DEBUG with `--verbose`)
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "debug,sqlx=warn,hyper=info,reqwest=info"
    } else {
        "info,sqlx=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
