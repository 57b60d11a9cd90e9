//! Withholding-tax report.
//!
//! Expenses carry tax the company withheld from its suppliers and must
//! remit. Incomes carry tax customers withheld from the company, which it
//! can credit.

use billbook_core::{TransactionRecord, TransactionSet};
use rust_decimal::Decimal;
use rust_xlsxwriter::XlsxError;

use crate::sheet::{workbook, Formats, SheetWriter};
use crate::{ReportArtifact, ReportContext, ReportError, ReportKind};

const COLUMNS: [(&str, f64); 7] = [
    ("Date", 12.0),
    ("Counterparty", 32.0),
    ("Tax ID", 16.0),
    ("Description", 32.0),
    ("Amount", 14.0),
    ("Rate %", 8.0),
    ("WHT", 12.0),
];

/// WHT withheld by the company (expenses) and from the company (incomes).
pub fn withholding_summary(ctx: &ReportContext, data: &TransactionSet) -> Result<ReportArtifact, ReportError> {
    let kind = ReportKind::WithholdingSummary;
    let bytes = render(ctx, data).map_err(ReportError::xlsx(kind))?;
    Ok(ReportArtifact::new(kind, ctx, bytes))
}

fn render(ctx: &ReportContext, data: &TransactionSet) -> Result<Vec<u8>, XlsxError> {
    let kind = ReportKind::WithholdingSummary;
    let formats = Formats::new();
    let mut book = workbook(ctx, kind.title())?;
    let sheet = book.add_worksheet();
    sheet.set_name("WHT")?;

    let mut w = SheetWriter::new(sheet, &formats);
    w.title_block(kind.title(), ctx)?;

    w.section("Withheld by the company (to remit)")?;
    w.header(&COLUMNS)?;
    section(&mut w, &data.expenses, "Total to remit")?;
    w.gap();

    w.section("Withheld from the company (creditable)")?;
    w.header(&COLUMNS)?;
    section(&mut w, &data.incomes, "Total creditable")?;

    book.save_to_buffer()
}

fn section(w: &mut SheetWriter<'_>, records: &[TransactionRecord], total_label: &str) -> Result<(), XlsxError> {
    let mut base = Decimal::ZERO;
    let mut wht = Decimal::ZERO;
    for record in records.iter().filter(|r| !r.amounts.wht.is_zero()) {
        w.text(0, &record.date.format("%Y-%m-%d").to_string())?;
        w.text(1, &record.counterparty_name)?;
        w.text(2, record.counterparty_tax_id.as_deref().unwrap_or_default())?;
        w.text(3, record.description.as_deref().unwrap_or_default())?;
        w.money(4, record.amounts.base)?;
        if let Some(rate) = record.wht_rate {
            w.money(5, rate)?;
        }
        w.money(6, record.amounts.wht)?;
        w.next_row();
        base += record.amounts.base;
        wht += record.amounts.wht;
    }
    w.total_label(3, total_label)?;
    w.total_money(4, base)?;
    w.total_money(6, wht)?;
    w.next_row();
    Ok(())
}
