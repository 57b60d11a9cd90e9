//! # Service Bootstrap
//!
//! Turns an [`AppConfig`] into a ready [`AppState`] and runs the server.

use std::net::SocketAddr;
use std::sync::Arc;

use billbook_archive::HttpEvidenceFetcher;
use billbook_store::PgTransactionSource;
use thiserror::Error;

use crate::config::AppConfig;
use crate::state::AppState;

/// Startup failures.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to build evidence HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build application state from configuration.
///
/// Without `DATABASE_URL` the service still starts; export requests answer
/// 503 and the readiness probe fails.
pub async fn bootstrap(config: &AppConfig) -> Result<AppState, BootstrapError> {
    let fetcher = HttpEvidenceFetcher::new(&config.export)?;
    let mut state = AppState::new(Arc::new(fetcher), &config.export, config.calendar());

    match &config.database_url {
        Some(url) => {
            let pool = billbook_store::init_pool(url).await?;
            if config.run_migrations {
                billbook_store::migrate(&pool).await?;
            }
            state = state
                .with_source(Arc::new(PgTransactionSource::new(pool.clone())))
                .with_db_pool(pool);
        }
        None => {
            tracing::warn!("DATABASE_URL not set. Export endpoints will return 503.");
        }
    }

    if !config.metrics_enabled {
        state = state.without_metrics();
    }
    Ok(state)
}

/// Bootstrap and serve until Ctrl-C / SIGTERM.
pub async fn serve(config: AppConfig) -> Result<(), BootstrapError> {
    tracing::debug!(?config, "starting");
    let state = bootstrap(&config).await?;
    let app = crate::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Billbook export API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
