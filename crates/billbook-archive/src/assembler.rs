//! # Archive Assembler
//!
//! Writes one export into a ZIP encoder in a fixed order:
//!
//! 1. `{root}/README.txt`
//! 2. every report under `{root}/reports/`
//! 3. every expense evidence file, then every income evidence file, each
//!    under its document-kind folder
//!
//! The encoder writes into any [`AsyncWrite`] sink. Entries are written
//! whole and one at a time, so at most one evidence file per in-flight
//! fetch is held in memory and the archive itself never is.
//!
//! ## Failure Model
//!
//! A failed evidence download is logged, recorded in the returned
//! [`ArchiveSummary`], and skipped. Its path was allocated before the
//! fetch, so skipping it never renames a later file. Encoder and sink
//! errors are fatal and surface as [`ArchiveError`].
//!
//! ## State
//!
//! ```text
//! Building ──► Finalizing ──► Done
//!    │             │
//!    └─────────────┴──► Aborted
//! ```

use std::pin::pin;

use async_zip::error::ZipError;
use async_zip::base::write::ZipFileWriter;
use async_zip::{Compression, DeflateOption, ZipEntryBuilder};
use billbook_core::{CompanyProfile, ExportPeriod, PathAllocator, TransactionSet};
use billbook_reports::ReportArtifact;
use bytes::Bytes;
use futures::StreamExt;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::compat::Compat;
use tokio_util::sync::CancellationToken;

use crate::fetch::{EvidenceFetcher, FetchError};
use crate::readme::render_readme;

/// Everything one archive is built from.
#[derive(Debug, Clone)]
pub struct ExportBundle {
    pub company: CompanyProfile,
    pub period: ExportPeriod,
    pub transactions: TransactionSet,
    /// Generated workbooks, in archive order.
    pub reports: Vec<ReportArtifact>,
}

impl ExportBundle {
    /// `{companyCode}_{year}-{MM}`, shared by the root folder and the
    /// download name.
    pub fn archive_stem(&self) -> String {
        self.period.archive_stem(&self.company.code)
    }

    /// Download filename, e.g. `ACME_2567-03.zip`.
    pub fn file_name(&self) -> String {
        format!("{}.zip", PathAllocator::new(self.archive_stem()).root())
    }

    /// Path of every evidence file, in write order.
    ///
    /// A pure function of the bundle: calling it twice yields the same
    /// paths, and it assigns exactly the names [`ArchiveAssembler`] writes.
    pub fn evidence_plan(&self) -> Vec<PlannedEvidence> {
        let mut allocator = PathAllocator::new(self.archive_stem());
        let mut plan = Vec::with_capacity(self.transactions.evidence_count());
        for record in self.transactions.records() {
            for (doc, evidence) in record.evidence.iter() {
                plan.push(PlannedEvidence {
                    path: allocator.allocate(record, doc, evidence),
                    url: evidence.url().to_string(),
                });
            }
        }
        plan
    }

    fn allocator(&self) -> PathAllocator {
        PathAllocator::new(self.archive_stem())
    }
}

/// One evidence file and the archive path it will occupy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedEvidence {
    pub path: String,
    pub url: String,
}

/// Lifecycle of one assembly run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyState {
    /// Entries are being written.
    Building,
    /// The central directory is being written.
    Finalizing,
    /// The archive is complete and the sink shut down.
    Done,
    /// A fatal error or cancellation ended the run.
    Aborted,
}

/// An evidence file that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OmittedEvidence {
    /// Path the file would have had.
    pub path: String,
    pub url: String,
    pub reason: String,
}

/// Outcome of a completed archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveSummary {
    pub state: AssemblyState,
    /// Entries in the archive, README and reports included.
    pub entries_written: usize,
    /// Evidence files in the archive.
    pub evidence_written: usize,
    /// Evidence files that could not be retrieved.
    pub omitted: Vec<OmittedEvidence>,
}

/// Fatal archive errors.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The ZIP encoder failed, usually because the sink failed.
    #[error("zip encoder error: {0}")]
    Encoder(#[from] ZipError),

    /// The sink failed outside the encoder.
    #[error("archive sink error: {0}")]
    Io(#[from] std::io::Error),

    /// The consumer went away or the export was cancelled.
    #[error("archive export cancelled")]
    Cancelled,

    /// The export ran past its deadline.
    #[error("archive export exceeded its {secs}s deadline")]
    DeadlineExceeded { secs: u64 },
}

/// Assembler tuning.
#[derive(Debug, Clone, Copy)]
pub struct AssemblerOptions {
    /// Evidence downloads in flight at once. Writes stay in order.
    pub fetch_concurrency: usize,
    /// Deflate level for every entry.
    pub compression: DeflateOption,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            fetch_concurrency: 1,
            compression: DeflateOption::Maximum,
        }
    }
}

/// Builds archives using one evidence fetcher.
#[derive(Debug, Clone)]
pub struct ArchiveAssembler<F> {
    fetcher: F,
    options: AssemblerOptions,
}

type Encoder<W> = ZipFileWriter<Compat<W>>;

struct Run {
    state: AssemblyState,
    entries_written: usize,
    evidence_written: usize,
    omitted: Vec<OmittedEvidence>,
}

impl<F: EvidenceFetcher> ArchiveAssembler<F> {
    pub fn new(fetcher: F, options: AssemblerOptions) -> Self {
        Self { fetcher, options }
    }

    pub fn options(&self) -> &AssemblerOptions {
        &self.options
    }

    /// Write the whole archive for `bundle` into `sink`, then shut the sink down.
    ///
    /// Returns once the central directory is written. `cancel` stops the
    /// run before the next fetch or write.
    pub async fn assemble<W>(
        &self,
        bundle: &ExportBundle,
        sink: W,
        cancel: &CancellationToken,
    ) -> Result<ArchiveSummary, ArchiveError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut run = Run {
            state: AssemblyState::Building,
            entries_written: 0,
            evidence_written: 0,
            omitted: Vec::new(),
        };

        match self.build(bundle, sink, cancel, &mut run).await {
            Ok(()) => {
                tracing::info!(
                    archive = %bundle.file_name(),
                    entries = run.entries_written,
                    evidence = run.evidence_written,
                    omitted = run.omitted.len(),
                    "archive complete"
                );
                Ok(ArchiveSummary {
                    state: run.state,
                    entries_written: run.entries_written,
                    evidence_written: run.evidence_written,
                    omitted: run.omitted,
                })
            }
            Err(err) => {
                let reached = run.state;
                run.state = AssemblyState::Aborted;
                tracing::warn!(
                    archive = %bundle.file_name(),
                    reached = ?reached,
                    state = ?run.state,
                    entries = run.entries_written,
                    error = %err,
                    "archive aborted"
                );
                Err(err)
            }
        }
    }

    async fn build<W>(
        &self,
        bundle: &ExportBundle,
        sink: W,
        cancel: &CancellationToken,
        run: &mut Run,
    ) -> Result<(), ArchiveError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let allocator = bundle.allocator();
        let mut encoder = ZipFileWriter::with_tokio(sink);

        let readme = render_readme(bundle);
        self.write_entry(&mut encoder, allocator.readme_path(), readme.as_bytes(), cancel)
            .await?;
        run.entries_written += 1;

        for report in &bundle.reports {
            self.write_entry(&mut encoder, allocator.report_path(&report.name), &report.bytes, cancel)
                .await?;
            run.entries_written += 1;
        }

        let concurrency = self.options.fetch_concurrency.max(1);
        let fetches = futures::stream::iter(bundle.evidence_plan())
            .map(|planned| async move {
                let result = self.fetch_one(&planned.url, cancel).await;
                (planned, result)
            })
            .buffered(concurrency);
        let mut fetches = pin!(fetches);

        while let Some((planned, result)) = fetches.next().await {
            match result {
                Ok(bytes) => {
                    self.write_entry(&mut encoder, planned.path, &bytes, cancel).await?;
                    run.entries_written += 1;
                    run.evidence_written += 1;
                }
                Err(FetchError::Cancelled) => return Err(ArchiveError::Cancelled),
                Err(err) => {
                    tracing::warn!(
                        url = %planned.url,
                        path = %planned.path,
                        reason = %err,
                        "evidence file unavailable, omitting from archive"
                    );
                    run.omitted.push(OmittedEvidence {
                        path: planned.path,
                        url: planned.url,
                        reason: err.to_string(),
                    });
                }
            }
        }

        run.state = AssemblyState::Finalizing;
        if cancel.is_cancelled() {
            return Err(ArchiveError::Cancelled);
        }
        let mut sink = encoder.close().await.map_err(|e| cancelled_or(cancel, e))?.into_inner();
        sink.shutdown().await.map_err(|e| cancelled_or(cancel, e))?;
        run.state = AssemblyState::Done;
        Ok(())
    }

    async fn fetch_one(&self, url: &str, cancel: &CancellationToken) -> Result<Bytes, FetchError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = self.fetcher.fetch(url) => result,
        }
    }

    async fn write_entry<W>(
        &self,
        encoder: &mut Encoder<W>,
        path: String,
        data: &[u8],
        cancel: &CancellationToken,
    ) -> Result<(), ArchiveError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        if cancel.is_cancelled() {
            return Err(ArchiveError::Cancelled);
        }
        tracing::trace!(path = %path, bytes = data.len(), "writing archive entry");
        let entry = ZipEntryBuilder::new(path.into(), Compression::Deflate).deflate_option(self.options.compression);
        encoder
            .write_entry_whole(entry, data)
            .await
            .map_err(|e| cancelled_or(cancel, e))
    }
}

/// Once cancelled, sink failures are a symptom of the consumer leaving.
fn cancelled_or<E: Into<ArchiveError>>(cancel: &CancellationToken, err: E) -> ArchiveError {
    if cancel.is_cancelled() {
        ArchiveError::Cancelled
    } else {
        err.into()
    }
}
