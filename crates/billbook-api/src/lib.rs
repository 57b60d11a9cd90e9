//! # billbook-api — Export Service
//!
//! Axum service that streams a company's monthly document archive.
//!
//! ## API Surface
//!
//! | Route                                             | Module                 |
//! |---------------------------------------------------|------------------------|
//! | `GET /v1/companies/{company_id}/exports/monthly`  | [`routes::exports`]    |
//! | `POST /v1/exports/monthly`                        | [`routes::exports`]    |
//! | `GET /openapi.json`                               | [`openapi`]            |
//! | `GET /health/liveness`, `GET /health/readiness`   | this module            |
//! | `GET /metrics`                                    | this module            |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```
//!
//! ## Crate Policy
//!
//! - No archive logic in handlers; they call into `billbook-archive`.
//! - All pre-stream errors map to structured responses via [`AppError`].

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};

pub use config::AppConfig;
pub use error::AppError;
pub use middleware::metrics::ApiMetrics;
pub use state::AppState;

/// Request bodies are tiny JSON documents.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    let metrics = state.metrics().cloned();

    let mut api = Router::new()
        .merge(routes::exports::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    if let Some(metrics) = &metrics {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api
        .layer(middleware::tracing_layer::layer())
        .with_state(state.clone());

    let mut probes = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    if let Some(metrics) = metrics {
        probes = probes
            .route("/metrics", get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    Router::new().merge(probes.with_state(state)).merge(api)
}

/// GET /metrics — Prometheus scrape endpoint.
async fn prometheus_metrics(Extension(metrics): Extension<ApiMetrics>) -> impl IntoResponse {
    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe. Always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe.
///
/// Not ready without a transaction data source, since every export would
/// answer 503. When a database is configured it must answer a trivial
/// query.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if state.source().is_none() {
        return (StatusCode::SERVICE_UNAVAILABLE, "no data source configured").into_response();
    }

    if let Some(pool) = state.db_pool() {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
