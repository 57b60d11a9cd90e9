//! # Application State
//!
//! Shared state handed to every handler. Cloning is cheap: everything is
//! behind an `Arc` or is `Copy`. Nothing in here is mutated per request;
//! each export owns its own collision table and channel.

use std::sync::Arc;

use billbook_archive::{ArchiveAssembler, EvidenceFetcher, ExportConfig, StreamOptions};
use billbook_core::{TransactionSource, YearCalendar};
use sqlx::PgPool;

use crate::middleware::metrics::ApiMetrics;

/// Assembler shared by all exports. The fetcher is type-erased so tests can
/// substitute their own.
pub type SharedAssembler = Arc<ArchiveAssembler<Arc<dyn EvidenceFetcher>>>;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    source: Option<Arc<dyn TransactionSource>>,
    assembler: SharedAssembler,
    calendar: YearCalendar,
    stream: StreamOptions,
    metrics: Option<ApiMetrics>,
    db_pool: Option<PgPool>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("source", &self.source.is_some())
            .field("calendar", &self.calendar)
            .field("stream", &self.stream)
            .field("metrics", &self.metrics.is_some())
            .field("db_pool", &self.db_pool.is_some())
            .finish()
    }
}

impl AppState {
    /// State with no data source; export requests answer 503 until one is
    /// attached with [`with_source`](Self::with_source).
    pub fn new(fetcher: Arc<dyn EvidenceFetcher>, export: &ExportConfig, calendar: YearCalendar) -> Self {
        Self {
            source: None,
            assembler: Arc::new(ArchiveAssembler::new(fetcher, export.into())),
            calendar,
            stream: export.into(),
            metrics: Some(ApiMetrics::new()),
            db_pool: None,
        }
    }

    /// Attach the transaction data source.
    pub fn with_source(mut self, source: Arc<dyn TransactionSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Attach the database pool checked by the readiness probe.
    pub fn with_db_pool(mut self, pool: PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Disable request and export metrics and the `/metrics` endpoint.
    pub fn without_metrics(mut self) -> Self {
        self.metrics = None;
        self
    }

    pub fn source(&self) -> Option<&Arc<dyn TransactionSource>> {
        self.source.as_ref()
    }

    pub fn assembler(&self) -> SharedAssembler {
        Arc::clone(&self.assembler)
    }

    pub fn calendar(&self) -> YearCalendar {
        self.calendar
    }

    pub fn stream_options(&self) -> StreamOptions {
        self.stream
    }

    pub fn metrics(&self) -> Option<&ApiMetrics> {
        self.metrics.as_ref()
    }

    pub fn db_pool(&self) -> Option<&PgPool> {
        self.db_pool.as_ref()
    }
}
