//! # Serve Subcommand
//!
//! Runs the HTTP export service. Configuration is read from the
//! environment exactly as the `billbook-api` binary does; flags here only
//! override it.

use anyhow::{Context, Result};
use billbook_api::AppConfig;
use clap::Args;

/// Arguments for `billbook serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on (overrides `PORT`).
    #[arg(long)]
    pub port: Option<u16>,

    /// Apply the bundled database migration before serving.
    #[arg(long)]
    pub migrate: bool,
}

/// Execute `billbook serve`. Returns when the server shuts down.
pub async fn run_serve(args: &ServeArgs) -> Result<u8> {
    let mut config = AppConfig::from_env().context("invalid configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    config.run_migrations |= args.migrate;

    billbook_api::bootstrap::serve(config).await?;
    Ok(0)
}
