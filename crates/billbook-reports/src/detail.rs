//! Per-record detail workbooks for expenses and incomes.

use billbook_core::{Amounts, TransactionRecord, TransactionSet};
use rust_xlsxwriter::XlsxError;

use crate::sheet::{workbook, Formats, SheetWriter};
use crate::{ReportArtifact, ReportContext, ReportError, ReportKind};

const COLUMNS: [(&str, f64); 11] = [
    ("No.", 6.0),
    ("Date", 12.0),
    ("Counterparty", 32.0),
    ("Tax ID", 16.0),
    ("Invoice no.", 16.0),
    ("Description", 36.0),
    ("Amount", 14.0),
    ("VAT", 12.0),
    ("WHT", 12.0),
    ("Net", 14.0),
    ("Status", 12.0),
];

/// One row per expense in the period, followed by a totals row.
pub fn expense_detail(ctx: &ReportContext, data: &TransactionSet) -> Result<ReportArtifact, ReportError> {
    let kind = ReportKind::ExpenseDetail;
    let bytes = render(ctx, kind, &data.expenses).map_err(ReportError::xlsx(kind))?;
    Ok(ReportArtifact::new(kind, ctx, bytes))
}

/// One row per income in the period, followed by a totals row.
pub fn income_detail(ctx: &ReportContext, data: &TransactionSet) -> Result<ReportArtifact, ReportError> {
    let kind = ReportKind::IncomeDetail;
    let bytes = render(ctx, kind, &data.incomes).map_err(ReportError::xlsx(kind))?;
    Ok(ReportArtifact::new(kind, ctx, bytes))
}

fn render(ctx: &ReportContext, kind: ReportKind, records: &[TransactionRecord]) -> Result<Vec<u8>, XlsxError> {
    let formats = Formats::new();
    let mut book = workbook(ctx, kind.title())?;
    let sheet = book.add_worksheet();
    sheet.set_name(kind.title())?;

    let mut w = SheetWriter::new(sheet, &formats);
    w.title_block(kind.title(), ctx)?;
    w.header(&COLUMNS)?;

    for (index, record) in records.iter().enumerate() {
        w.number(0, (index + 1) as f64)?;
        w.text(1, &record.date.format("%Y-%m-%d").to_string())?;
        w.text(2, &record.counterparty_name)?;
        w.text(3, record.counterparty_tax_id.as_deref().unwrap_or_default())?;
        w.text(4, record.invoice_number.as_deref().unwrap_or_default())?;
        w.text(5, record.description.as_deref().unwrap_or_default())?;
        w.money(6, record.amounts.base)?;
        w.money(7, record.amounts.vat)?;
        w.money(8, record.amounts.wht)?;
        w.money(9, record.amounts.net)?;
        w.text(10, &record.status)?;
        w.next_row();
    }

    let total: Amounts = records.iter().map(|r| r.amounts).sum();
    w.total_label(5, &format!("Total ({} records)", records.len()))?;
    w.total_money(6, total.base)?;
    w.total_money(7, total.vat)?;
    w.total_money(8, total.wht)?;
    w.total_money(9, total.net)?;

    book.save_to_buffer()
}
