//! # Request/Response Tracing
//!
//! Configures `tower_http::trace::TraceLayer` for structured request
//! logging with tracing spans.

use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Build the `TraceLayer` used on every route.
///
/// Spans carry method and URI; responses are logged at `INFO` with status
/// and latency. For archive downloads the response event fires when headers
/// are sent, not when the body finishes.
pub fn layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_constructs_without_panic() {
        let _layer = layer();
    }
}
