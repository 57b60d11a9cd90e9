//! Everything that must succeed before the first archive byte is sent.
//!
//! [`prepare_export`] resolves the period, loads the company and its
//! records, and renders the reports. Any error here is reported to the
//! caller as a normal failure; once it returns, the only fatal errors left
//! are encoder and transport errors.

use billbook_core::{CompanyId, CoreError, ExportRequest, SourceError, TransactionSource, YearCalendar};
use billbook_reports::{generate_all, ReportContext, ReportError};

use crate::assembler::ExportBundle;

/// Pre-stream export failures.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Month or year out of range.
    #[error(transparent)]
    InvalidRequest(#[from] CoreError),

    /// No company with this id.
    #[error("company {0} not found")]
    CompanyNotFound(CompanyId),

    /// The data source failed.
    #[error("transaction data unavailable: {0}")]
    Source(#[from] SourceError),

    /// A report could not be generated.
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Load and render everything the archive needs for `request`.
pub async fn prepare_export<S>(
    source: &S,
    request: &ExportRequest,
    calendar: YearCalendar,
) -> Result<ExportBundle, ExportError>
where
    S: TransactionSource + ?Sized,
{
    let period = request.period(calendar)?;
    let company = source
        .company(request.company_id())
        .await?
        .ok_or(ExportError::CompanyNotFound(request.company_id()))?;

    let transactions = source.fetch_transactions(company.id, &period).await?;
    tracing::debug!(
        company = %company.id,
        period = %period,
        storage_year = period.storage_year(),
        expenses = transactions.expenses.len(),
        incomes = transactions.incomes.len(),
        evidence = transactions.evidence_count(),
        "loaded export data"
    );

    let ctx = ReportContext {
        company_name: company.name.clone(),
        company_tax_id: company.tax_id.clone(),
        period,
    };
    let reports = generate_all(&ctx, &transactions)?;

    Ok(ExportBundle {
        company,
        period,
        transactions,
        reports,
    })
}
