//! # billbook-api — Binary Entry Point
//!
//! Starts the export service. Configuration comes from the environment;
//! see [`billbook_api::AppConfig::from_env`].

use billbook_api::{bootstrap, telemetry, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing("info");

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Configuration error: {e}");
        e
    })?;

    bootstrap::serve(config).await?;
    Ok(())
}
