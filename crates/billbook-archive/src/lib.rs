//! # billbook-archive — Monthly Archive Assembly and Streaming
//!
//! Builds the ZIP archive for one company and month and streams it out as
//! it is produced:
//!
//! - [`prepare_export`] loads data and renders reports (all fallible work
//!   that must finish before streaming starts).
//! - [`HttpEvidenceFetcher`] downloads evidence files with retry on
//!   transport errors and a per-file size cap.
//! - [`ArchiveAssembler`] writes README, reports and evidence into an
//!   async ZIP encoder, skipping files that cannot be retrieved.
//! - [`spawn_export`] runs the assembler on a background task behind a
//!   bounded channel and hands back a byte stream for the response body.
//!
//! ## Crate Policy
//!
//! - No HTTP server types; the API crate adapts [`ArchiveBodyStream`] to
//!   its response body.
//! - One collision table per archive. Nothing here is global.
//! - No `.unwrap()` outside tests.

pub mod assembler;
pub mod config;
pub mod export;
pub mod fetch;
pub mod readme;
pub(crate) mod retry;
pub mod stream;

pub use assembler::{
    ArchiveAssembler, ArchiveError, ArchiveSummary, AssemblerOptions, AssemblyState, ExportBundle,
    OmittedEvidence, PlannedEvidence,
};
pub use config::{ConfigError, ExportConfig};
pub use export::{prepare_export, ExportError};
pub use fetch::{EvidenceFetcher, FetchError, HttpEvidenceFetcher};
pub use readme::render_readme;
pub use stream::{archive_channel, spawn_export, ArchiveBodyStream, ChannelWriter, ExportTask, StreamOptions};

impl From<&ExportConfig> for AssemblerOptions {
    fn from(config: &ExportConfig) -> Self {
        Self {
            fetch_concurrency: config.fetch_concurrency.max(1),
            ..Self::default()
        }
    }
}

impl From<&ExportConfig> for StreamOptions {
    fn from(config: &ExportConfig) -> Self {
        Self {
            channel_capacity: config.channel_capacity.max(1),
            deadline: config.deadline(),
        }
    }
}
