//! # Prometheus Metrics
//!
//! Request metrics recorded by middleware, plus export outcome metrics
//! recorded when a background export finishes. Exported in Prometheus text
//! format at `/metrics`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    core::Collector, Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

/// Latency buckets shared by request and export histograms, in seconds.
const REQUEST_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
const EXPORT_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0];

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // -- Export pipeline metrics --
    exports_total: IntCounterVec,
    export_duration_seconds: Histogram,
    evidence_omitted_total: IntCounter,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("evidence_omitted", &self.evidence_omitted())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("billbook_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("billbook_http_request_duration_seconds", "Time to response headers in seconds")
                .buckets(REQUEST_BUCKETS.to_vec()),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new("billbook_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let exports_total = IntCounterVec::new(
            Opts::new("billbook_exports_total", "Monthly archive exports by outcome"),
            &["outcome"],
        )
        .expect("metric can be created");

        let export_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("billbook_export_duration_seconds", "Wall time of one archive export in seconds")
                .buckets(EXPORT_BUCKETS.to_vec()),
        )
        .expect("metric can be created");

        let evidence_omitted_total = IntCounter::new(
            "billbook_export_evidence_omitted_total",
            "Evidence files left out of archives because they could not be retrieved",
        )
        .expect("metric can be created");

        for collector in [
            Box::new(http_requests_total.clone()) as Box<dyn Collector>,
            Box::new(http_request_duration_seconds.clone()),
            Box::new(http_errors_total.clone()),
            Box::new(exports_total.clone()),
            Box::new(export_duration_seconds.clone()),
            Box::new(evidence_omitted_total.clone()),
        ] {
            registry.register(collector).expect("metric names are unique");
        }

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                exports_total,
                export_duration_seconds,
                evidence_omitted_total,
            }),
        }
    }

    /// Total requests seen (sum across all labels).
    pub fn requests(&self) -> u64 {
        self.inner
            .http_requests_total
            .collect()
            .iter()
            .flat_map(|mf| mf.get_metric())
            .map(|m| m.get_counter().get_value() as u64)
            .sum()
    }

    /// Total evidence files omitted across all exports.
    pub fn evidence_omitted(&self) -> u64 {
        self.inner.evidence_omitted_total.get()
    }

    /// Exports that ended with `outcome`.
    pub fn exports(&self, outcome: &str) -> u64 {
        self.inner.exports_total.with_label_values(&[outcome]).get()
    }

    /// Record a finished (or rejected) export.
    pub fn record_export(&self, outcome: &str, duration_secs: f64) {
        self.inner.exports_total.with_label_values(&[outcome]).inc();
        self.inner.export_duration_seconds.observe(duration_secs);
    }

    /// Count evidence files that were left out of an archive.
    pub fn record_omitted(&self, count: usize) {
        self.inner.evidence_omitted_total.inc_by(count as u64);
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();

        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);

        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace UUID path segments with `{id}` to keep label cardinality bounded.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if uuid::Uuid::try_parse(segment).is_ok() {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware that records request count, latency and errors.
///
/// For export downloads the latency is time to response headers; the body
/// keeps streaming after this returns.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.record_request(&method, &path, response.status().as_u16(), start.elapsed().as_secs_f64());
    }

    response
}
