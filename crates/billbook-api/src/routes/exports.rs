//! # Monthly Archive Export API
//!
//! Routes:
//! - GET  /v1/companies/{company_id}/exports/monthly?month=M&year=Y
//! - POST /v1/exports/monthly  `{ "company_id", "month", "year" }`
//!
//! Both answer with the archive as a streamed `application/zip` body. All
//! validation and data loading happens before the response starts, so
//! those failures are ordinary JSON errors. Once headers are sent, the
//! archive is assembled on a background task; a fatal error from then on
//! aborts the body and is only visible in logs and metrics.

use std::time::Instant;

use axum::body::Body;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use billbook_archive::{prepare_export, spawn_export, ArchiveError, ArchiveSummary, ExportTask};
use billbook_core::{CompanyId, ExportRequest};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::{extract_json, extract_path, extract_query};
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Query parameters for the GET form.
#[derive(Debug, Deserialize, IntoParams)]
pub struct MonthlyExportParams {
    /// Month, 1-12.
    pub month: u32,
    /// Year as the user sees it (Buddhist Era unless configured otherwise).
    pub year: i32,
}

/// Body of the POST form.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MonthlyExportRequest {
    pub company_id: Uuid,
    /// Month, 1-12.
    pub month: u32,
    /// Year as the user sees it (Buddhist Era unless configured otherwise).
    pub year: i32,
}

/// Build the exports router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/companies/{company_id}/exports/monthly", get(export_monthly))
        .route("/v1/exports/monthly", post(export_monthly_post))
}

/// GET /v1/companies/{company_id}/exports/monthly — Download a month's archive.
#[utoipa::path(
    get,
    path = "/v1/companies/{company_id}/exports/monthly",
    params(
        ("company_id" = Uuid, Path, description = "Company ID"),
        MonthlyExportParams,
    ),
    responses(
        (status = 200, description = "ZIP archive, streamed", content_type = "application/zip", body = Vec<u8>),
        (status = 404, description = "Unknown company", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid month or year", body = crate::error::ErrorBody),
        (status = 502, description = "Transaction data unavailable", body = crate::error::ErrorBody),
        (status = 503, description = "No data source configured", body = crate::error::ErrorBody),
    ),
    tag = "exports"
)]
pub(crate) async fn export_monthly(
    State(state): State<AppState>,
    company_id: Result<Path<Uuid>, PathRejection>,
    params: Result<Query<MonthlyExportParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let company_id = extract_path(company_id)?;
    let params = extract_query(params)?;
    start_export(&state, company_id, params.month, params.year).await
}

/// POST /v1/exports/monthly — Download a month's archive.
#[utoipa::path(
    post,
    path = "/v1/exports/monthly",
    request_body = MonthlyExportRequest,
    responses(
        (status = 200, description = "ZIP archive, streamed", content_type = "application/zip", body = Vec<u8>),
        (status = 404, description = "Unknown company", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
        (status = 502, description = "Transaction data unavailable", body = crate::error::ErrorBody),
        (status = 503, description = "No data source configured", body = crate::error::ErrorBody),
    ),
    tag = "exports"
)]
pub(crate) async fn export_monthly_post(
    State(state): State<AppState>,
    body: Result<Json<MonthlyExportRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let req = extract_json(body)?;
    start_export(&state, req.company_id, req.month, req.year).await
}

async fn start_export(state: &AppState, company_id: Uuid, month: u32, year: i32) -> Result<Response, AppError> {
    let started = Instant::now();
    let result = prepare_and_spawn(state, company_id, month, year, started).await;
    if result.is_err() {
        if let Some(metrics) = state.metrics() {
            metrics.record_export("rejected", started.elapsed().as_secs_f64());
        }
    }
    result
}

async fn prepare_and_spawn(
    state: &AppState,
    company_id: Uuid,
    month: u32,
    year: i32,
    started: Instant,
) -> Result<Response, AppError> {
    let source = state
        .source()
        .ok_or_else(|| AppError::service_unavailable("no transaction data source configured"))?;
    let request = ExportRequest::new(CompanyId(company_id), month, year)?;

    let bundle = prepare_export(source.as_ref(), &request, state.calendar()).await?;
    let ExportTask {
        file_name,
        body,
        handle,
    } = spawn_export(state.assembler(), bundle, state.stream_options());

    tracing::info!(
        company = %request.company_id(),
        month,
        year,
        archive = %file_name,
        "export started"
    );
    tokio::spawn(watch_export(handle, file_name.clone(), started, state.metrics().cloned()));

    let disposition = HeaderValue::from_str(&content_disposition(&file_name))
        .map_err(|e| AppError::Internal(format!("content-disposition for {file_name:?}: {e}")))?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(body),
    )
        .into_response())
}

/// Log and count how a background export ended.
async fn watch_export(
    handle: JoinHandle<Result<ArchiveSummary, ArchiveError>>,
    file_name: String,
    started: Instant,
    metrics: Option<ApiMetrics>,
) {
    let outcome = match handle.await {
        Ok(Ok(summary)) => {
            if !summary.omitted.is_empty() {
                let paths: Vec<&str> = summary.omitted.iter().map(|o| o.path.as_str()).collect();
                tracing::warn!(
                    archive = %file_name,
                    omitted = summary.omitted.len(),
                    paths = ?paths,
                    "archive completed without some evidence files"
                );
                if let Some(m) = &metrics {
                    m.record_omitted(summary.omitted.len());
                }
            }
            tracing::info!(
                archive = %file_name,
                entries = summary.entries_written,
                evidence = summary.evidence_written,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "export finished"
            );
            "completed"
        }
        Ok(Err(ArchiveError::Cancelled)) => {
            tracing::info!(archive = %file_name, "export cancelled by client disconnect");
            "cancelled"
        }
        Ok(Err(ArchiveError::DeadlineExceeded { secs })) => {
            tracing::warn!(archive = %file_name, deadline_secs = secs, "export deadline exceeded");
            "deadline_exceeded"
        }
        Ok(Err(err)) => {
            tracing::error!(archive = %file_name, error = %err, "export failed mid-stream");
            "failed"
        }
        Err(join) => {
            tracing::error!(archive = %file_name, error = %join, "export task panicked");
            "failed"
        }
    };

    if let Some(m) = metrics {
        m.record_export(outcome, started.elapsed().as_secs_f64());
    }
}

/// `Content-Disposition` for a download named `file_name`.
///
/// The quoted `filename` is an ASCII fallback; names with other characters
/// also get an RFC 5987 `filename*` so browsers keep the original.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    if fallback == file_name {
        return format!("attachment; filename=\"{file_name}\"");
    }

    let mut encoded = String::with_capacity(file_name.len() * 3);
    for byte in file_name.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}
