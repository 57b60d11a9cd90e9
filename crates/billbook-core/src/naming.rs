//! # Archive Path Allocation
//!
//! Maps evidence files onto human-readable, filesystem-safe paths inside
//! the archive and keeps those paths unique.
//!
//! ## Layout
//!
//! ```text
//! {company}_{year}-{MM}/
//!   README.txt
//!   reports/{report}_{year}-{MM}.xlsx
//!   expenses/{slips,tax-invoices,wht-certificates,bills,other}/
//!   incomes/{slips,tax-invoices,wht-certificates,bills,other}/
//! ```
//!
//! Evidence files are named `{date}-{counterparty}-{label}.{ext}`. When the
//! same name is allocated again in the same folder, the n-th occurrence
//! gets `-{n}` before the extension. Counters follow visit order, so the
//! same records always produce the same paths.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::record::{DocKind, EvidenceRef, TransactionKind, TransactionRecord};

/// Folder holding the generated workbooks.
pub const REPORTS_DIR: &str = "reports";

/// Name of the generated summary file at the archive root.
pub const README_NAME: &str = "README.txt";

/// Maximum length, in characters, of a sanitized name component.
pub const MAX_COMPONENT_CHARS: usize = 80;

/// Extension used when the URL does not reveal one.
pub const FALLBACK_EXTENSION: &str = "bin";

const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Folder, relative to the archive root, for one transaction/document kind.
pub fn folder_for(kind: TransactionKind, doc: DocKind) -> &'static str {
    match (kind, doc) {
        (TransactionKind::Expense, DocKind::Slip) => "expenses/slips",
        (TransactionKind::Expense, DocKind::Invoice) => "expenses/tax-invoices",
        (TransactionKind::Expense, DocKind::Withholding) => "expenses/wht-certificates",
        (TransactionKind::Expense, DocKind::Bill) => "expenses/bills",
        (TransactionKind::Expense, DocKind::Other) => "expenses/other",
        (TransactionKind::Income, DocKind::Slip) => "incomes/slips",
        (TransactionKind::Income, DocKind::Invoice) => "incomes/tax-invoices",
        (TransactionKind::Income, DocKind::Withholding) => "incomes/wht-certificates",
        (TransactionKind::Income, DocKind::Bill) => "incomes/bills",
        (TransactionKind::Income, DocKind::Other) => "incomes/other",
    }
}

/// Make `raw` safe to use as part of a filename.
///
/// Removes characters that are illegal on common filesystems and control
/// characters, turns runs of whitespace and hyphens into one hyphen, trims
/// leading and trailing hyphens and dots, and caps the length. Returns
/// `"unknown"` when nothing usable remains.
pub fn sanitize_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_hyphen = false;

    for c in raw.chars() {
        if c.is_whitespace() || c == '-' {
            pending_hyphen = true;
            continue;
        }
        if c.is_control() || ILLEGAL_CHARS.contains(&c) {
            continue;
        }
        if pending_hyphen && !out.is_empty() {
            out.push('-');
        }
        pending_hyphen = false;
        out.push(c);
    }

    let trimmed: String = out
        .trim_matches(|c| c == '-' || c == '.')
        .chars()
        .take(MAX_COMPONENT_CHARS)
        .collect();
    let trimmed = trimmed.trim_end_matches(|c| c == '-' || c == '.');

    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Filename label for a document. `Other` documents use their tag when present.
pub fn doc_label(doc: DocKind, tag: Option<&str>) -> String {
    match (doc, tag) {
        (DocKind::Other, Some(tag)) => sanitize_component(&tag.to_lowercase()),
        _ => doc.label().to_string(),
    }
}

/// Extension of the last path segment of `url`, lowercased.
///
/// Falls back to [`FALLBACK_EXTENSION`] when the segment has no extension
/// or the extension is not 1–5 ASCII alphanumerics.
pub fn extension_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();
    match segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => FALLBACK_EXTENSION.to_string(),
    }
}

/// Build `{date}-{counterparty}-{label}[-{n}].{ext}`.
///
/// `collision` is the occurrence number of this name within its folder;
/// pass `None` for the first occurrence.
pub fn name_for(
    date: NaiveDate,
    counterparty: &str,
    label: &str,
    extension: &str,
    collision: Option<u32>,
) -> String {
    let base = format!(
        "{}-{}-{}",
        date.format("%Y-%m-%d"),
        sanitize_component(counterparty),
        label
    );
    match collision {
        Some(n) => format!("{base}-{n}.{extension}"),
        None => format!("{base}.{extension}"),
    }
}

/// Occurrence counters keyed by `(folder, base filename)`, plus every final
/// name handed out per folder.
///
/// Scoped to one archive build. The build task owns it exclusively.
#[derive(Debug, Default)]
pub struct NameCollisionTable {
    counters: HashMap<(String, String), u32>,
    taken: HashSet<(String, String)>,
}

impl NameCollisionTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more use of `base` in `folder`.
    ///
    /// Returns `None` for the first use and `Some(n)` for the n-th.
    pub fn register(&mut self, folder: &str, base: &str) -> Option<u32> {
        let count = self
            .counters
            .entry((folder.to_string(), base.to_string()))
            .or_insert(0);
        *count += 1;
        (*count > 1).then_some(*count)
    }

    /// Mark `name` as used in `folder`. Returns `false` if it already was.
    pub fn claim(&mut self, folder: &str, name: &str) -> bool {
        self.taken.insert((folder.to_string(), name.to_string()))
    }

    /// Number of distinct base names seen.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Whether nothing has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

/// Allocates unique archive paths under one root folder.
#[derive(Debug)]
pub struct PathAllocator {
    root: String,
    table: NameCollisionTable,
}

impl PathAllocator {
    /// Allocator for an archive whose entries live under `root`.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: sanitize_component(&root.into()),
            table: NameCollisionTable::new(),
        }
    }

    /// Sanitized root folder.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Path of the README.
    pub fn readme_path(&self) -> String {
        format!("{}/{README_NAME}", self.root)
    }

    /// Path of a generated report.
    pub fn report_path(&self, report_name: &str) -> String {
        format!("{}/{REPORTS_DIR}/{report_name}", self.root)
    }

    /// Allocate the path for one evidence file of `record`.
    ///
    /// Each call consumes a name, whether or not the file is later written.
    pub fn allocate(&mut self, record: &TransactionRecord, doc: DocKind, evidence: &EvidenceRef) -> String {
        let folder = folder_for(record.kind, doc);
        let label = doc_label(doc, evidence.tag());
        let extension = extension_from_url(evidence.url());
        let base = name_for(record.date, &record.counterparty_name, &label, &extension, None);
        let mut collision = self.table.register(folder, &base);
        // A suffixed name can equal another document's base name
        // (an `Other` tagged "other 2"), so skip numbers already taken.
        loop {
            let name = match collision {
                Some(_) => name_for(record.date, &record.counterparty_name, &label, &extension, collision),
                None => base.clone(),
            };
            if self.table.claim(folder, &name) {
                return format!("{}/{folder}/{name}", self.root);
            }
            collision = Some(collision.map_or(2, |n| n + 1));
        }
    }
}
