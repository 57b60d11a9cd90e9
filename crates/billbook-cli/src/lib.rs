//! # billbook-cli — Billbook Command-Line Interface
//!
//! ## Subcommands
//!
//! - `export`: Write one company's monthly archive to a local ZIP file,
//!   reading records from a JSON fixture or PostgreSQL.
//! - `serve`: Run the HTTP export service.
//! - `period`: Print the date range a month/year resolves to.
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; export logic lives in `billbook-archive`.
//! - Handlers return a process exit code; errors propagate as `anyhow`.

pub mod export;
pub mod period;
pub mod serve;
