//! VAT report: output tax on sales, input tax on purchases, and the balance.

use billbook_core::{TransactionRecord, TransactionSet};
use rust_decimal::Decimal;
use rust_xlsxwriter::XlsxError;

use crate::sheet::{workbook, Formats, SheetWriter};
use crate::{ReportArtifact, ReportContext, ReportError, ReportKind};

const COLUMNS: [(&str, f64); 6] = [
    ("Date", 12.0),
    ("Invoice no.", 16.0),
    ("Counterparty", 32.0),
    ("Tax ID", 16.0),
    ("Amount", 14.0),
    ("VAT", 12.0),
];

/// Output VAT from incomes, input VAT from expenses, then payable or refundable.
///
/// Only records carrying VAT are listed.
pub fn vat_summary(ctx: &ReportContext, data: &TransactionSet) -> Result<ReportArtifact, ReportError> {
    let kind = ReportKind::VatSummary;
    let bytes = render(ctx, data).map_err(ReportError::xlsx(kind))?;
    Ok(ReportArtifact::new(kind, ctx, bytes))
}

fn render(ctx: &ReportContext, data: &TransactionSet) -> Result<Vec<u8>, XlsxError> {
    let kind = ReportKind::VatSummary;
    let formats = Formats::new();
    let mut book = workbook(ctx, kind.title())?;
    let sheet = book.add_worksheet();
    sheet.set_name(kind.title())?;

    let mut w = SheetWriter::new(sheet, &formats);
    w.title_block(kind.title(), ctx)?;

    w.section("Output VAT (sales)")?;
    w.header(&COLUMNS)?;
    let output = section(&mut w, &data.incomes, "Total output VAT")?;
    w.gap();

    w.section("Input VAT (purchases)")?;
    w.header(&COLUMNS)?;
    let input = section(&mut w, &data.expenses, "Total input VAT")?;
    w.gap();

    let balance = output - input;
    if balance >= Decimal::ZERO {
        w.total_label(3, "VAT payable")?;
        w.total_money(5, balance)?;
    } else {
        w.total_label(3, "VAT refundable")?;
        w.total_money(5, -balance)?;
    }

    book.save_to_buffer()
}

/// Rows for records with non-zero VAT plus a totals row. Returns the VAT total.
fn section(w: &mut SheetWriter<'_>, records: &[TransactionRecord], total_label: &str) -> Result<Decimal, XlsxError> {
    let mut base = Decimal::ZERO;
    let mut vat = Decimal::ZERO;
    for record in records.iter().filter(|r| !r.amounts.vat.is_zero()) {
        w.text(0, &record.date.format("%Y-%m-%d").to_string())?;
        w.text(1, record.invoice_number.as_deref().unwrap_or_default())?;
        w.text(2, &record.counterparty_name)?;
        w.text(3, record.counterparty_tax_id.as_deref().unwrap_or_default())?;
        w.money(4, record.amounts.base)?;
        w.money(5, record.amounts.vat)?;
        w.next_row();
        base += record.amounts.base;
        vat += record.amounts.vat;
    }
    w.total_label(3, total_label)?;
    w.total_money(4, base)?;
    w.total_money(5, vat)?;
    w.next_row();
    Ok(vat)
}
