//! # Civic-Ledger Node
//!
//! Entry point for a single civic-services node.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging on stderr (`RUST_LOG` overrides the `info` default)
//! 2. Load configuration from `CR_*` environment variables and validate it
//! 3. Initialize subsystems and register the bootstrap admin
//! 4. Serve the line console when `CR_CONSOLE` is set
//! 5. Run until Ctrl+C, then shut down gracefully

use anyhow::{Context, Result};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use node_runtime::{NodeConfig, NodeRuntime};

/// Logs go to stderr; stdout carries console responses only.
fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let config = NodeConfig::from_env().context("Invalid environment configuration")?;
    config.validate().context("Invalid node configuration")?;
    let console = config.console.enabled;

    let runtime = NodeRuntime::new(config);
    runtime
        .start()
        .await
        .context("Failed to register bootstrap admin")?;

    if console {
        runtime.spawn_console(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
    }

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;

    if console {
        // A pending stdin read holds the runtime open until the next line.
        std::process::exit(0);
    }
    Ok(())
}
