//! Export tuning configuration.
//!
//! Every knob has a default suitable for production. Override via
//! environment variables or explicit construction in tests.

use std::time::Duration;

/// Default per-file fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default cap on a single evidence file (50 MiB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;

/// Default number of buffered chunks between the encoder and the client.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Settings for one export pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Timeout for each evidence request, in seconds.
    pub fetch_timeout_secs: u64,
    /// Evidence files fetched concurrently. `1` fetches strictly one at a time.
    pub fetch_concurrency: usize,
    /// Larger evidence files are omitted from the archive.
    pub max_file_bytes: u64,
    /// Capacity of the encoder-to-client channel, in chunks.
    pub channel_capacity: usize,
    /// Upper bound on one whole export. `None` means unbounded.
    pub deadline_secs: Option<u64>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            fetch_concurrency: 1,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            deadline_secs: None,
        }
    }
}

impl ExportConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `EXPORT_FETCH_TIMEOUT_SECS` (default: 30)
    /// - `EXPORT_FETCH_CONCURRENCY` (default: 1)
    /// - `EXPORT_MAX_FILE_BYTES` (default: 52428800)
    /// - `EXPORT_CHANNEL_CAPACITY` (default: 16)
    /// - `EXPORT_DEADLINE_SECS` (default: unset)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            fetch_timeout_secs: env_parse("EXPORT_FETCH_TIMEOUT_SECS")?.unwrap_or(defaults.fetch_timeout_secs),
            fetch_concurrency: env_parse("EXPORT_FETCH_CONCURRENCY")?
                .unwrap_or(defaults.fetch_concurrency)
                .max(1),
            max_file_bytes: env_parse("EXPORT_MAX_FILE_BYTES")?.unwrap_or(defaults.max_file_bytes),
            channel_capacity: env_parse("EXPORT_CHANNEL_CAPACITY")?
                .unwrap_or(defaults.channel_capacity)
                .max(1),
            deadline_secs: env_parse("EXPORT_DEADLINE_SECS")?.filter(|secs| *secs > 0),
        })
    }

    /// Per-file fetch timeout.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Whole-export deadline, if configured.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

/// Parse an optional numeric environment variable. Unset or empty is `None`.
pub fn env_parse<T: std::str::FromStr>(var: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw.trim().parse().map(Some).map_err(|_| ConfigError::Invalid {
            var: var.to_string(),
            value: raw,
        }),
        Err(_) => Ok(None),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sequential_and_unbounded() {
        let cfg = ExportConfig::default();
        assert_eq!(cfg.fetch_concurrency, 1);
        assert_eq!(cfg.max_file_bytes, 52_428_800);
        assert_eq!(cfg.deadline(), None);
        assert_eq!(cfg.fetch_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn env_parse_absent_is_none() {
        let value: Option<u64> = env_parse("BILLBOOK_TEST_UNSET_VAR_81723").unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn env_parse_rejects_garbage() {
        std::env::set_var("BILLBOOK_TEST_BAD_NUMBER", "twelve");
        let result: Result<Option<u64>, _> = env_parse("BILLBOOK_TEST_BAD_NUMBER");
        std::env::remove_var("BILLBOOK_TEST_BAD_NUMBER");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn env_parse_reads_value() {
        std::env::set_var("BILLBOOK_TEST_GOOD_NUMBER", " 8 ");
        let result: Option<usize> = env_parse("BILLBOOK_TEST_GOOD_NUMBER").unwrap();
        std::env::remove_var("BILLBOOK_TEST_GOOD_NUMBER");
        assert_eq!(result, Some(8));
    }
}
