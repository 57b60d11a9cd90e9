//! # Export Subcommand
//!
//! Writes one company's monthly archive to a local file using the same
//! pipeline as the HTTP service. Records come from a JSON fixture (see
//! `billbook_store::Fixture`) or from PostgreSQL.
//!
//! The archive is written to `<output>.part` and renamed on success, so an
//! interrupted run never leaves a file that looks complete.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use billbook_archive::{prepare_export, ArchiveAssembler, ArchiveSummary, AssemblerOptions, ExportConfig, HttpEvidenceFetcher};
use billbook_core::{CompanyId, ExportRequest, TransactionSource, YearCalendar, BUDDHIST_ERA_OFFSET};
use billbook_store::{MemorySource, PgTransactionSource};
use clap::Args;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Arguments for `billbook export`.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Company ID.
    #[arg(long)]
    pub company: Uuid,

    /// Month, 1-12.
    #[arg(long)]
    pub month: u32,

    /// Display year (Buddhist Era by default).
    #[arg(long)]
    pub year: i32,

    /// Read records from this JSON fixture instead of the database.
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    /// PostgreSQL connection string.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Output file. Defaults to the archive name in the output directory.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Directory for the default output file.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Display year minus stored year.
    #[arg(long, env = "YEAR_OFFSET", default_value_t = BUDDHIST_ERA_OFFSET)]
    pub year_offset: i32,

    /// Evidence files fetched concurrently.
    #[arg(long, env = "EXPORT_FETCH_CONCURRENCY", default_value_t = 1)]
    pub concurrency: usize,

    /// Per-file fetch timeout in seconds.
    #[arg(long, env = "EXPORT_FETCH_TIMEOUT_SECS", default_value_t = billbook_archive::config::DEFAULT_FETCH_TIMEOUT_SECS)]
    pub fetch_timeout_secs: u64,

    /// Exit with status 2 when any evidence file had to be omitted.
    #[arg(long)]
    pub strict: bool,
}

impl ExportArgs {
    fn export_config(&self) -> ExportConfig {
        ExportConfig {
            fetch_timeout_secs: self.fetch_timeout_secs,
            fetch_concurrency: self.concurrency.max(1),
            ..ExportConfig::default()
        }
    }
}

/// Execute `billbook export`.
pub async fn run_export(args: &ExportArgs) -> Result<u8> {
    let source = open_source(args).await?;
    let config = args.export_config();
    let fetcher = HttpEvidenceFetcher::new(&config).context("failed to build HTTP client")?;

    let (path, summary) = export_to_file(source.as_ref(), fetcher, args, &config).await?;

    println!("wrote {}", path.display());
    println!(
        "  {} entries ({} evidence files)",
        summary.entries_written, summary.evidence_written
    );
    if summary.omitted.is_empty() {
        return Ok(0);
    }

    println!("  {} evidence files omitted:", summary.omitted.len());
    for omitted in &summary.omitted {
        println!("    {} ({})", omitted.path, omitted.reason);
    }
    Ok(if args.strict { 2 } else { 0 })
}

async fn open_source(args: &ExportArgs) -> Result<Arc<dyn TransactionSource>> {
    if let Some(fixture) = &args.fixture {
        let json = tokio::fs::read_to_string(fixture)
            .await
            .with_context(|| format!("failed to read fixture: {}", fixture.display()))?;
        let source = MemorySource::from_json(&json)
            .with_context(|| format!("invalid fixture: {}", fixture.display()))?;
        return Ok(Arc::new(source));
    }

    let url = args
        .database_url
        .as_deref()
        .context("either --fixture or DATABASE_URL is required")?;
    let pool = billbook_store::init_pool(url).await.context("database connection failed")?;
    Ok(Arc::new(PgTransactionSource::new(pool)))
}

/// Prepare and assemble the archive, returning the final path.
async fn export_to_file<S>(
    source: &S,
    fetcher: HttpEvidenceFetcher,
    args: &ExportArgs,
    config: &ExportConfig,
) -> Result<(PathBuf, ArchiveSummary)>
where
    S: TransactionSource + ?Sized,
{
    let request = ExportRequest::new(CompanyId(args.company), args.month, args.year)?;
    let bundle = prepare_export(source, &request, YearCalendar::with_offset(args.year_offset)).await?;

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| args.output_dir.join(bundle.file_name()));
    let partial = partial_path(&path);

    let file = tokio::fs::File::create(&partial)
        .await
        .with_context(|| format!("failed to create {}", partial.display()))?;
    let assembler = ArchiveAssembler::new(fetcher, AssemblerOptions::from(config));

    let summary = match assembler.assemble(&bundle, file, &CancellationToken::new()).await {
        Ok(summary) => summary,
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e).context("archive assembly failed");
        }
    };

    tokio::fs::rename(&partial, &path)
        .await
        .with_context(|| format!("failed to move archive into place: {}", path.display()))?;
    tracing::info!(path = %path.display(), entries = summary.entries_written, "archive written");
    Ok((path, summary))
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}
