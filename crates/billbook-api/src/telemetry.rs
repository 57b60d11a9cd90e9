//! Tracing subscriber setup shared by the service and CLI binaries.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// Filtering follows `RUST_LOG`, falling back to `default_filter`.
/// `LOG_FORMAT=json` switches to one JSON object per line.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
