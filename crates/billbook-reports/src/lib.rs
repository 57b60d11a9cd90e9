//! # billbook-reports — Monthly Spreadsheet Reports
//!
//! Turns a company's fetched transactions for one month into the five
//! workbooks that form the numeric backbone of the archive export:
//!
//! | Function                 | Workbook                               |
//! |--------------------------|----------------------------------------|
//! | [`expense_detail`]       | One row per expense, with totals       |
//! | [`income_detail`]        | One row per income, with totals        |
//! | [`monthly_summary`]      | Income vs expense totals, net result   |
//! | [`vat_summary`]          | Output VAT, input VAT, VAT payable     |
//! | [`withholding_summary`]  | WHT withheld by and from the company   |
//!
//! Every function is pure: records in, named xlsx buffer out, no I/O. A
//! failure here is fatal for the export; the archive is never streamed
//! without its reports.

mod detail;
mod sheet;
mod summary;
mod vat;
mod wht;

use billbook_core::{ExportPeriod, TransactionSet};
use thiserror::Error;

pub use detail::{expense_detail, income_detail};
pub use summary::monthly_summary;
pub use vat::vat_summary;
pub use wht::withholding_summary;

/// Inputs shared by all reports besides the records themselves.
#[derive(Debug, Clone)]
pub struct ReportContext {
    /// Company display name.
    pub company_name: String,
    /// Company tax identification number, if registered.
    pub company_tax_id: Option<String>,
    /// The exported month.
    pub period: ExportPeriod,
}

/// The five report kinds, in archive order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    ExpenseDetail,
    IncomeDetail,
    MonthlySummary,
    VatSummary,
    WithholdingSummary,
}

impl ReportKind {
    /// All kinds in the order they are written to the archive.
    pub const ALL: [ReportKind; 5] = [
        ReportKind::ExpenseDetail,
        ReportKind::IncomeDetail,
        ReportKind::MonthlySummary,
        ReportKind::VatSummary,
        ReportKind::WithholdingSummary,
    ];

    /// Filename prefix.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::ExpenseDetail => "expense-detail",
            Self::IncomeDetail => "income-detail",
            Self::MonthlySummary => "monthly-summary",
            Self::VatSummary => "vat-summary",
            Self::WithholdingSummary => "wht-summary",
        }
    }

    /// Title written at the top of the sheet.
    pub fn title(&self) -> &'static str {
        match self {
            Self::ExpenseDetail => "Expense detail",
            Self::IncomeDetail => "Income detail",
            Self::MonthlySummary => "Monthly summary",
            Self::VatSummary => "VAT report",
            Self::WithholdingSummary => "Withholding tax report",
        }
    }

    /// Filename for `period`, e.g. `vat-summary_2567-03.xlsx`.
    pub fn file_name(&self, period: &ExportPeriod) -> String {
        format!("{}_{}.xlsx", self.slug(), period.label())
    }
}

/// One generated workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub kind: ReportKind,
    /// Filename inside the archive's reports folder.
    pub name: String,
    /// Complete xlsx file.
    pub bytes: Vec<u8>,
}

impl ReportArtifact {
    fn new(kind: ReportKind, ctx: &ReportContext, bytes: Vec<u8>) -> Self {
        Self {
            kind,
            name: kind.file_name(&ctx.period),
            bytes,
        }
    }
}

/// Errors from report generation.
#[derive(Error, Debug)]
pub enum ReportError {
    /// The spreadsheet writer rejected the workbook.
    #[error("failed to build {report} workbook: {source}")]
    Xlsx {
        report: &'static str,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },
}

impl ReportError {
    pub(crate) fn xlsx(kind: ReportKind) -> impl FnOnce(rust_xlsxwriter::XlsxError) -> ReportError {
        move |source| ReportError::Xlsx {
            report: kind.slug(),
            source,
        }
    }
}

/// Generate all five reports in archive order.
pub fn generate_all(ctx: &ReportContext, data: &TransactionSet) -> Result<Vec<ReportArtifact>, ReportError> {
    let reports = vec![
        expense_detail(ctx, data)?,
        income_detail(ctx, data)?,
        monthly_summary(ctx, data)?,
        vat_summary(ctx, data)?,
        withholding_summary(ctx, data)?,
    ];
    tracing::debug!(
        period = %ctx.period,
        bytes = reports.iter().map(|r| r.bytes.len()).sum::<usize>(),
        "generated monthly reports"
    );
    Ok(reports)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Read;

    use billbook_core::{
        Amounts, DocKind, EvidenceSet, ExportPeriod, TransactionKind, TransactionRecord, TransactionSet,
        YearCalendar,
    };
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use crate::ReportContext;

    pub fn context() -> ReportContext {
        ReportContext {
            company_name: "ACME Trading Co., Ltd.".into(),
            company_tax_id: Some("0105555000001".into()),
            period: ExportPeriod::resolve(3, 2567, YearCalendar::BUDDHIST).unwrap(),
        }
    }

    pub fn sample() -> TransactionSet {
        let day = |d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
        let mut rent = TransactionRecord::new(TransactionKind::Expense, day(1), "Landlord Co")
            .with_amounts(Amounts::from_parts(dec!(20000), dec!(0), dec!(1000)))
            .with_evidence(EvidenceSet::default().with_url(DocKind::Slip, "https://f/rent.jpg"));
        rent.wht_rate = Some(dec!(5));
        rent.counterparty_tax_id = Some("0105555000099".into());
        let mut supplies = TransactionRecord::new(TransactionKind::Expense, day(4), "Office Mart")
            .with_amounts(Amounts::from_parts(dec!(1000), dec!(70), dec!(0)));
        supplies.invoice_number = Some("INV-778".into());
        let mut consulting = TransactionRecord::new(TransactionKind::Income, day(20), "Client Ltd")
            .with_amounts(Amounts::from_parts(dec!(50000), dec!(3500), dec!(1500)));
        consulting.wht_rate = Some(dec!(3));
        TransactionSet {
            expenses: vec![rent, supplies],
            incomes: vec![consulting],
        }
    }

    /// Shared strings of a generated workbook.
    pub fn shared_strings(bytes: &[u8]) -> String {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name("xl/sharedStrings.xml").unwrap();
        let mut xml = String::new();
        file.read_to_string(&mut xml).unwrap();
        xml
    }
}
