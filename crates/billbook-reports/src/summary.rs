//! Monthly income-versus-expense summary.

use billbook_core::{Amounts, TransactionSet};
use rust_xlsxwriter::XlsxError;

use crate::sheet::{workbook, Formats, SheetWriter};
use crate::{ReportArtifact, ReportContext, ReportError, ReportKind};

/// Totals per side, evidence counts, and the net cash result.
pub fn monthly_summary(ctx: &ReportContext, data: &TransactionSet) -> Result<ReportArtifact, ReportError> {
    let kind = ReportKind::MonthlySummary;
    let bytes = render(ctx, data).map_err(ReportError::xlsx(kind))?;
    Ok(ReportArtifact::new(kind, ctx, bytes))
}

fn render(ctx: &ReportContext, data: &TransactionSet) -> Result<Vec<u8>, XlsxError> {
    let kind = ReportKind::MonthlySummary;
    let formats = Formats::new();
    let mut book = workbook(ctx, kind.title())?;
    let sheet = book.add_worksheet();
    sheet.set_name(kind.title())?;

    let income: Amounts = data.incomes.iter().map(|r| r.amounts).sum();
    let expense: Amounts = data.expenses.iter().map(|r| r.amounts).sum();
    let income_docs: usize = data.incomes.iter().map(|r| r.evidence.len()).sum();
    let expense_docs: usize = data.expenses.iter().map(|r| r.evidence.len()).sum();

    let mut w = SheetWriter::new(sheet, &formats);
    w.title_block(kind.title(), ctx)?;
    w.header(&[
        ("Side", 14.0),
        ("Records", 10.0),
        ("Documents", 12.0),
        ("Amount", 14.0),
        ("VAT", 12.0),
        ("WHT", 12.0),
        ("Net", 14.0),
    ])?;

    for (label, count, docs, totals) in [
        ("Income", data.incomes.len(), income_docs, income),
        ("Expense", data.expenses.len(), expense_docs, expense),
    ] {
        w.text(0, label)?;
        w.number(1, count as f64)?;
        w.number(2, docs as f64)?;
        w.money(3, totals.base)?;
        w.money(4, totals.vat)?;
        w.money(5, totals.wht)?;
        w.money(6, totals.net)?;
        w.next_row();
    }

    w.total_label(0, "Net result")?;
    w.total_money(3, income.base - expense.base)?;
    w.total_money(6, income.net - expense.net)?;

    book.save_to_buffer()
}
