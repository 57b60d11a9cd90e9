//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into a single OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the export service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Billbook Export API",
        version = "0.1.0",
        description = "Streams a company's monthly document archive: a README, five xlsx reports and every retrievable evidence file, as one ZIP download.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        crate::routes::exports::export_monthly,
        crate::routes::exports::export_monthly_post,
    ),
    components(schemas(
        crate::routes::exports::MonthlyExportRequest,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "exports", description = "Monthly archive downloads"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
