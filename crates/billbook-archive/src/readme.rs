//! The plain-text README placed at the top of every archive.

use std::fmt::Write as _;

use billbook_core::naming::REPORTS_DIR;
use billbook_core::{folder_for, DocKind, TransactionKind, TransactionRecord};

use crate::assembler::ExportBundle;

/// Render the README for `bundle`.
///
/// The text depends only on the bundle, never on the clock or on which
/// downloads later succeed.
pub fn render_readme(bundle: &ExportBundle) -> String {
    let company = &bundle.company;
    let period = &bundle.period;
    let data = &bundle.transactions;

    let mut out = String::new();
    let _ = writeln!(out, "Monthly document archive");
    let _ = writeln!(out, "========================");
    let _ = writeln!(out);
    let _ = writeln!(out, "Company:  {}", company.name);
    if let Some(tax_id) = &company.tax_id {
        let _ = writeln!(out, "Tax ID:   {tax_id}");
    }
    let _ = writeln!(
        out,
        "Period:   {} ({} to {})",
        period.display_label(),
        period.start_date(),
        period.end_date()
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Contents");
    let _ = writeln!(out, "--------");
    let _ = writeln!(out, "{}", count_line("Expenses", &data.expenses));
    let _ = writeln!(out, "{}", count_line("Incomes", &data.incomes));
    let _ = writeln!(out, "Reports:  {}", bundle.reports.len());
    let _ = writeln!(out);
    let _ = writeln!(out, "Layout");
    let _ = writeln!(out, "------");
    let _ = writeln!(out, "{REPORTS_DIR}/");
    for report in &bundle.reports {
        let _ = writeln!(out, "    {}", report.name);
    }
    for kind in [TransactionKind::Expense, TransactionKind::Income] {
        for doc in DocKind::ALL {
            let _ = writeln!(out, "{}/", folder_for(kind, doc));
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Evidence files are named YYYY-MM-DD-counterparty-document.ext. \
         A trailing -2, -3, ... separates files that would otherwise share a name."
    );
    let _ = writeln!(
        out,
        "Files that could not be retrieved from storage at export time are not included."
    );
    out
}

fn count_line(label: &str, records: &[TransactionRecord]) -> String {
    let files: usize = records.iter().map(|r| r.evidence.len()).sum();
    format!("{:<9} {} records, {} evidence files", format!("{label}:"), records.len(), files)
}
