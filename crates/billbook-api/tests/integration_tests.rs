//! # Integration Tests for billbook-api
//!
//! Drives the full router with `tower::ServiceExt::oneshot`: archive
//! downloads over both request forms, pre-stream error mapping, health
//! probes, metrics and the OpenAPI document. Evidence files are served by
//! wiremock and archives are read back with the `zip` crate.

use std::io::Cursor;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use billbook_api::AppState;
use billbook_archive::{ExportConfig, HttpEvidenceFetcher};
use billbook_core::{
    Amounts, CompanyId, CompanyProfile, DocKind, EvidenceSet, TransactionKind, TransactionRecord, YearCalendar,
};
use billbook_store::MemorySource;
use chrono::NaiveDate;
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

fn acme() -> CompanyProfile {
    CompanyProfile {
        id: CompanyId::new(),
        code: "ACME".into(),
        name: "ACME Trading".into(),
        tax_id: Some("0105555000001".into()),
    }
}

/// March 2024: two expenses (slip / none) and one income (slip + WHT cert).
fn seeded_source(company: &CompanyProfile, base: &str) -> MemorySource {
    let source = MemorySource::new();
    source.insert_company(company.clone());
    source.insert_record(
        company.id,
        TransactionRecord::new(TransactionKind::Expense, day(3), "Office Mart")
            .with_amounts(Amounts::from_parts(dec!(1200), dec!(84), dec!(0)))
            .with_evidence(EvidenceSet::default().with_url(DocKind::Slip, format!("{base}/e1/slip.jpg"))),
    );
    source.insert_record(
        company.id,
        TransactionRecord::new(TransactionKind::Expense, day(11), "City Water")
            .with_amounts(Amounts::from_parts(dec!(300), dec!(21), dec!(0))),
    );
    source.insert_record(
        company.id,
        TransactionRecord::new(TransactionKind::Income, day(25), "Client Ltd")
            .with_amounts(Amounts::from_parts(dec!(40000), dec!(2800), dec!(1200)))
            .with_evidence(
                EvidenceSet::default()
                    .with_url(DocKind::Slip, format!("{base}/i1/slip.png"))
                    .with_url(DocKind::Withholding, format!("{base}/i1/wht.pdf")),
            ),
    );
    // Outside the requested month.
    source.insert_record(
        company.id,
        TransactionRecord::new(TransactionKind::Expense, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(), "April Co"),
    );
    source
}

async fn evidence_server() -> MockServer {
    let server = MockServer::start().await;
    for (file, body) in [
        ("/e1/slip.jpg", &b"expense slip"[..]),
        ("/i1/slip.png", &b"income slip"[..]),
        ("/i1/wht.pdf", &b"wht certificate"[..]),
    ] {
        Mock::given(method("GET"))
            .and(path(file))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .mount(&server)
            .await;
    }
    server
}

fn base_state() -> AppState {
    let fetcher = HttpEvidenceFetcher::with_client(reqwest::Client::new(), 1024 * 1024);
    AppState::new(Arc::new(fetcher), &ExportConfig::default(), YearCalendar::BUDDHIST)
}

fn state_with(source: MemorySource) -> AppState {
    base_state().with_source(Arc::new(source))
}

async fn get(state: AppState, uri: &str) -> Response<Body> {
    billbook_api::app(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn entry_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let response = get(base_state(), "/health/liveness").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"ok");
}

#[tokio::test]
async fn test_readiness_without_source_is_unavailable() {
    let response = get(base_state(), "/health/readiness").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_readiness_with_memory_source() {
    let response = get(state_with(MemorySource::new()), "/health/readiness").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"ready");
}

// -- Archive Downloads --------------------------------------------------------

#[tokio::test]
async fn test_get_export_streams_complete_archive() {
    let server = evidence_server().await;
    let company = acme();
    let state = state_with(seeded_source(&company, &server.uri()));

    let uri = format!("/v1/companies/{}/exports/monthly?month=3&year=2567", company.id);
    let response = get(state, &uri).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"ACME_2567-03.zip\""
    );

    let names = entry_names(&body_bytes(response).await);
    assert_eq!(names.len(), 9);
    assert_eq!(names[0], "ACME_2567-03/README.txt");
    assert!(names.contains(&"ACME_2567-03/expenses/slips/2024-03-03-Office-Mart-slip.jpg".to_string()));
    assert!(!names.iter().any(|n| n.contains("April")));
}

#[tokio::test]
async fn test_post_export_matches_get_form() {
    let server = evidence_server().await;
    let company = acme();
    let state = state_with(seeded_source(&company, &server.uri()));

    let body = serde_json::json!({ "company_id": company.id, "month": 3, "year": 2567 });
    let response = billbook_api::app(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/exports/monthly")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(entry_names(&body_bytes(response).await).len(), 9);
}

#[tokio::test]
async fn test_missing_evidence_still_downloads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/i1/slip.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"file".to_vec()))
        .mount(&server)
        .await;

    let company = acme();
    let state = state_with(seeded_source(&company, &server.uri()));
    let uri = format!("/v1/companies/{}/exports/monthly?month=3&year=2567", company.id);
    let response = get(state, &uri).await;

    assert_eq!(response.status(), StatusCode::OK);
    let names = entry_names(&body_bytes(response).await);
    assert_eq!(names.len(), 8);
    assert!(names.contains(&"ACME_2567-03/incomes/wht-certificates/2024-03-25-Client-Ltd-wht-cert.pdf".to_string()));
}

#[tokio::test]
async fn test_empty_month_has_readme_and_reports() {
    let company = acme();
    let state = state_with(seeded_source(&company, "https://files.invalid"));
    let uri = format!("/v1/companies/{}/exports/monthly?month=1&year=2567", company.id);
    let response = get(state, &uri).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"ACME_2567-01.zip\""
    );
    assert_eq!(entry_names(&body_bytes(response).await).len(), 6);
}

// -- Pre-stream Errors --------------------------------------------------------

#[tokio::test]
async fn test_invalid_month_is_422() {
    let company = acme();
    let state = state_with(seeded_source(&company, "https://files.invalid"));
    let uri = format!("/v1/companies/{}/exports/monthly?month=13&year=2567", company.id);
    let response = get(state, &uri).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_missing_query_parameter_is_422() {
    let company = acme();
    let state = state_with(seeded_source(&company, "https://files.invalid"));
    let uri = format!("/v1/companies/{}/exports/monthly?month=3", company.id);
    let response = get(state, &uri).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_malformed_company_id_is_422() {
    let state = state_with(MemorySource::new());
    let response = get(state, "/v1/companies/not-a-uuid/exports/monthly?month=3&year=2567").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_unknown_company_is_404() {
    let state = state_with(MemorySource::new());
    let metrics = state.metrics().cloned().unwrap();
    let uri = format!("/v1/companies/{}/exports/monthly?month=3&year=2567", CompanyId::new());
    let response = get(state, &uri).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
    assert_eq!(metrics.exports("rejected"), 1);
}

#[tokio::test]
async fn test_no_data_source_is_503() {
    let uri = format!("/v1/companies/{}/exports/monthly?month=3&year=2567", CompanyId::new());
    let response = get(base_state(), &uri).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["error"]["code"], "SERVICE_UNAVAILABLE");
}

// -- Metrics & OpenAPI --------------------------------------------------------

#[tokio::test]
async fn test_metrics_endpoint_counts_requests() {
    let state = state_with(MemorySource::new());
    let app = billbook_api::app(state);

    let uri = format!("/v1/companies/{}/exports/monthly?month=3&year=2567", CompanyId::new());
    let _ = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(text.contains("billbook_http_requests_total"));
    assert!(text.contains("path=\"/v1/companies/{id}/exports/monthly\""));
    assert!(text.contains("billbook_exports_total{outcome=\"rejected\"} 1"));
}

#[tokio::test]
async fn test_metrics_can_be_disabled() {
    let response = get(base_state().without_metrics(), "/metrics").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let response = get(base_state(), "/openapi.json").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["paths"]["/v1/exports/monthly"]["post"].is_object());
}
