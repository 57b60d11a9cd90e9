//! # billbook CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use billbook_cli::export::{run_export, ExportArgs};
use billbook_cli::period::{run_period, PeriodArgs};
use billbook_cli::serve::{run_serve, ServeArgs};

/// Billbook monthly document archive tooling.
#[derive(Parser, Debug)]
#[command(name = "billbook", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write one company's monthly archive to a ZIP file.
    Export(ExportArgs),

    /// Run the HTTP export service.
    Serve(ServeArgs),

    /// Show the date range a month and year resolve to.
    Period(PeriodArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    billbook_api::telemetry::init_tracing(default_filter);

    let result = match cli.command {
        Commands::Period(args) => run_period(&args),
        Commands::Export(args) => block_on(run_export(&args)),
        Commands::Serve(args) => block_on(run_serve(&args)),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn block_on<F>(future: F) -> anyhow::Result<u8>
where
    F: std::future::Future<Output = anyhow::Result<u8>>,
{
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(future)
}
