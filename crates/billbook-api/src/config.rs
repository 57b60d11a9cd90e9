//! # Service Configuration
//!
//! Everything the service reads from its environment, parsed once at
//! startup. Invalid values fail startup instead of silently falling back.

use billbook_archive::config::env_parse;
use billbook_archive::{ConfigError, ExportConfig};
use billbook_core::YearCalendar;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Top-level service configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind to (default: 8080).
    pub port: u16,
    /// PostgreSQL connection string. `None` runs without a data source.
    pub database_url: Option<String>,
    /// Apply the bundled migration on startup.
    pub run_migrations: bool,
    /// Offset between the displayed year and the stored year (default: 543).
    pub year_offset: i32,
    /// Serve `/metrics` and record request metrics.
    pub metrics_enabled: bool,
    /// Export pipeline tuning.
    pub export: ExportConfig,
}

/// Custom Debug that redacts the database URL, which usually embeds a password.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("run_migrations", &self.run_migrations)
            .field("year_offset", &self.year_offset)
            .field("metrics_enabled", &self.metrics_enabled)
            .field("export", &self.export)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            run_migrations: false,
            year_offset: billbook_core::BUDDHIST_ERA_OFFSET,
            metrics_enabled: true,
            export: ExportConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PORT` (default: 8080)
    /// - `DATABASE_URL` (default: unset, exports answer 503)
    /// - `RUN_MIGRATIONS` (default: false)
    /// - `YEAR_OFFSET` (default: 543)
    /// - `METRICS_ENABLED` (default: true)
    /// - the `EXPORT_*` variables read by [`ExportConfig::from_env`]
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            port: env_parse("PORT")?.unwrap_or(defaults.port),
            database_url: std::env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            run_migrations: env_flag("RUN_MIGRATIONS")?.unwrap_or(defaults.run_migrations),
            year_offset: env_parse("YEAR_OFFSET")?.unwrap_or(defaults.year_offset),
            metrics_enabled: env_flag("METRICS_ENABLED")?.unwrap_or(defaults.metrics_enabled),
            export: ExportConfig::from_env()?,
        })
    }

    /// Calendar used to interpret request years.
    pub fn calendar(&self) -> YearCalendar {
        YearCalendar::with_offset(self.year_offset)
    }
}

/// Parse a boolean environment variable (`true/false`, `1/0`, `yes/no`).
fn env_flag(var: &str) -> Result<Option<bool>, ConfigError> {
    let Ok(raw) = std::env::var(var) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::Invalid {
            var: var.to_string(),
            value: raw,
        }),
    }
}
