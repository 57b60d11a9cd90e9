//! # Transaction Records
//!
//! Read-only snapshots of expenses and incomes as the archive export sees
//! them. Records are fully materialized by the data source before any
//! report is generated and are never mutated afterwards.
//!
//! ## Evidence References
//!
//! Uploaded evidence lists are stored as loosely shaped JSON: some rows
//! hold bare URL strings, others hold `{ "url": ..., "type": ... }`
//! objects. [`EvidenceRef::normalize_list`] converts either shape into the
//! closed [`EvidenceRef`] variant once, at the data boundary, so nothing
//! downstream has to re-inspect the JSON.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::request::CompanyId;

/// Whether a record is money going out or coming in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Money paid to a supplier.
    Expense,
    /// Money received from a customer.
    Income,
}

impl TransactionKind {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of an evidence file. Determines its folder in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocKind {
    /// Payment slip or transfer receipt.
    Slip,
    /// Tax invoice.
    Invoice,
    /// Withholding-tax certificate.
    Withholding,
    /// Bill or invoice copy that is not a tax invoice.
    Bill,
    /// Any other supporting document.
    Other,
}

impl DocKind {
    /// All kinds in archive traversal order.
    pub const ALL: [DocKind; 5] = [
        DocKind::Slip,
        DocKind::Invoice,
        DocKind::Withholding,
        DocKind::Bill,
        DocKind::Other,
    ];

    /// Label used inside evidence filenames.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Slip => "slip",
            Self::Invoice => "tax-invoice",
            Self::Withholding => "wht-cert",
            Self::Bill => "bill",
            Self::Other => "other",
        }
    }
}

/// A pointer to one uploaded evidence file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvidenceRef {
    /// A bare URL.
    PlainUrl(String),
    /// A URL with an optional sub-type tag (used for `Other` documents).
    TypedDoc {
        /// Location of the file.
        url: String,
        /// Free-form sub-type, e.g. `"contract"` or `"quotation"`.
        #[serde(default, alias = "type", alias = "docType")]
        kind: Option<String>,
    },
}

impl EvidenceRef {
    /// Location of the file.
    pub fn url(&self) -> &str {
        match self {
            Self::PlainUrl(url) => url,
            Self::TypedDoc { url, .. } => url,
        }
    }

    /// Sub-type tag, if any.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::PlainUrl(_) => None,
            Self::TypedDoc { kind, .. } => kind.as_deref().filter(|k| !k.trim().is_empty()),
        }
    }

    /// Normalize a stored evidence column into references.
    ///
    /// Accepts `null`, a single URL string, or an array mixing URL strings
    /// and `{url, type|kind|docType}` objects. Empty strings and elements
    /// without a usable URL are dropped with a warning.
    pub fn normalize_list(value: &serde_json::Value) -> Vec<EvidenceRef> {
        use serde_json::Value;

        match value {
            Value::Null => Vec::new(),
            Value::String(url) => Self::from_url(url).into_iter().collect(),
            Value::Array(items) => items.iter().filter_map(Self::from_element).collect(),
            other => {
                tracing::warn!(value = %other, "ignoring evidence column with unexpected shape");
                Vec::new()
            }
        }
    }

    fn from_url(url: &str) -> Option<EvidenceRef> {
        let url = url.trim();
        (!url.is_empty()).then(|| EvidenceRef::PlainUrl(url.to_string()))
    }

    fn from_element(item: &serde_json::Value) -> Option<EvidenceRef> {
        use serde_json::Value;

        match item {
            Value::String(url) => Self::from_url(url),
            Value::Object(map) => {
                let url = map.get("url").and_then(Value::as_str).map(str::trim);
                match url {
                    Some(url) if !url.is_empty() => {
                        let kind = ["kind", "type", "docType"]
                            .iter()
                            .find_map(|key| map.get(*key).and_then(Value::as_str))
                            .map(str::to_string);
                        Some(EvidenceRef::TypedDoc {
                            url: url.to_string(),
                            kind,
                        })
                    }
                    _ => {
                        tracing::warn!(element = %item, "dropping evidence element without url");
                        None
                    }
                }
            }
            other => {
                tracing::warn!(element = %other, "dropping evidence element with unexpected shape");
                None
            }
        }
    }
}

/// Evidence lists of one record, grouped by document kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSet {
    #[serde(default)]
    pub slips: Vec<EvidenceRef>,
    #[serde(default)]
    pub invoices: Vec<EvidenceRef>,
    #[serde(default)]
    pub withholding: Vec<EvidenceRef>,
    #[serde(default)]
    pub bills: Vec<EvidenceRef>,
    #[serde(default)]
    pub other: Vec<EvidenceRef>,
}

impl EvidenceSet {
    /// The list for one kind.
    pub fn get(&self, kind: DocKind) -> &[EvidenceRef] {
        match kind {
            DocKind::Slip => &self.slips,
            DocKind::Invoice => &self.invoices,
            DocKind::Withholding => &self.withholding,
            DocKind::Bill => &self.bills,
            DocKind::Other => &self.other,
        }
    }

    fn get_mut(&mut self, kind: DocKind) -> &mut Vec<EvidenceRef> {
        match kind {
            DocKind::Slip => &mut self.slips,
            DocKind::Invoice => &mut self.invoices,
            DocKind::Withholding => &mut self.withholding,
            DocKind::Bill => &mut self.bills,
            DocKind::Other => &mut self.other,
        }
    }

    /// Append a reference to the list for `kind`.
    pub fn push(&mut self, kind: DocKind, evidence: EvidenceRef) {
        self.get_mut(kind).push(evidence);
    }

    /// Builder-style [`push`](Self::push) of a plain URL.
    pub fn with_url(mut self, kind: DocKind, url: impl Into<String>) -> Self {
        self.push(kind, EvidenceRef::PlainUrl(url.into()));
        self
    }

    /// Every reference in traversal order: kind order, then list order.
    pub fn iter(&self) -> impl Iterator<Item = (DocKind, &EvidenceRef)> + '_ {
        DocKind::ALL
            .into_iter()
            .flat_map(move |kind| self.get(kind).iter().map(move |e| (kind, e)))
    }

    /// Total number of references.
    pub fn len(&self) -> usize {
        DocKind::ALL.iter().map(|k| self.get(*k).len()).sum()
    }

    /// Whether the record has no evidence at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Monetary breakdown of a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amounts {
    /// Amount before taxes.
    pub base: Decimal,
    /// Value-added tax.
    pub vat: Decimal,
    /// Withholding tax deducted at source.
    pub wht: Decimal,
    /// Amount actually paid or received.
    pub net: Decimal,
}

impl Amounts {
    /// Derive `net = base + vat - wht`.
    pub fn from_parts(base: Decimal, vat: Decimal, wht: Decimal) -> Self {
        Self {
            base,
            vat,
            wht,
            net: base + vat - wht,
        }
    }
}

impl std::ops::Add for Amounts {
    type Output = Amounts;

    fn add(self, rhs: Amounts) -> Amounts {
        Amounts {
            base: self.base + rhs.base,
            vat: self.vat + rhs.vat,
            wht: self.wht + rhs.wht,
            net: self.net + rhs.net,
        }
    }
}

impl std::iter::Sum for Amounts {
    fn sum<I: Iterator<Item = Amounts>>(iter: I) -> Amounts {
        iter.fold(Amounts::default(), |acc, a| acc + a)
    }
}

/// Normalized view over an expense or an income.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub kind: TransactionKind,
    pub date: NaiveDate,
    pub counterparty_name: String,
    #[serde(default)]
    pub counterparty_tax_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    pub amounts: Amounts,
    /// Withholding rate in percent, e.g. `3` for 3%.
    #[serde(default)]
    pub wht_rate: Option<Decimal>,
    pub status: String,
    #[serde(default)]
    pub evidence: EvidenceSet,
}

impl TransactionRecord {
    /// Minimal record with zero amounts and no evidence.
    pub fn new(kind: TransactionKind, date: NaiveDate, counterparty_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            date,
            counterparty_name: counterparty_name.into(),
            counterparty_tax_id: None,
            description: None,
            invoice_number: None,
            amounts: Amounts::default(),
            wht_rate: None,
            status: "pending".to_string(),
            evidence: EvidenceSet::default(),
        }
    }

    /// Builder-style setter for the amounts.
    pub fn with_amounts(mut self, amounts: Amounts) -> Self {
        self.amounts = amounts;
        self
    }

    /// Builder-style setter for the evidence lists.
    pub fn with_evidence(mut self, evidence: EvidenceSet) -> Self {
        self.evidence = evidence;
        self
    }
}

/// All records of one company and period, fully materialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSet {
    pub expenses: Vec<TransactionRecord>,
    pub incomes: Vec<TransactionRecord>,
}

impl TransactionSet {
    /// Records in archive traversal order: expenses, then incomes.
    pub fn records(&self) -> impl Iterator<Item = &TransactionRecord> + '_ {
        self.expenses.iter().chain(self.incomes.iter())
    }

    /// Number of evidence references across all records.
    pub fn evidence_count(&self) -> usize {
        self.records().map(|r| r.evidence.len()).sum()
    }

    /// Whether there are no records at all.
    pub fn is_empty(&self) -> bool {
        self.expenses.is_empty() && self.incomes.is_empty()
    }
}

/// Company details needed to label an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub id: CompanyId,
    /// Short code used in archive names, e.g. `ACME`.
    pub code: String,
    /// Registered display name.
    pub name: String,
    #[serde(default)]
    pub tax_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn normalize_mixed_list() {
        let raw = json!([
            "https://files.example/a.jpg",
            {"url": "https://files.example/b.pdf", "type": "contract"},
            {"url": "https://files.example/c.png"},
            "",
            {"name": "no url"},
            42
        ]);
        let refs = EvidenceRef::normalize_list(&raw);
        assert_eq!(
            refs,
            vec![
                EvidenceRef::PlainUrl("https://files.example/a.jpg".into()),
                EvidenceRef::TypedDoc {
                    url: "https://files.example/b.pdf".into(),
                    kind: Some("contract".into()),
                },
                EvidenceRef::TypedDoc {
                    url: "https://files.example/c.png".into(),
                    kind: None,
                },
            ]
        );
        assert_eq!(refs[1].tag(), Some("contract"));
        assert_eq!(refs[2].tag(), None);
    }

    #[test]
    fn normalize_null_and_scalar() {
        assert!(EvidenceRef::normalize_list(&serde_json::Value::Null).is_empty());
        assert_eq!(
            EvidenceRef::normalize_list(&json!("https://x/y.jpg")),
            vec![EvidenceRef::PlainUrl("https://x/y.jpg".into())]
        );
        assert!(EvidenceRef::normalize_list(&json!({"url": "x"})).is_empty());
    }

    #[test]
    fn evidence_ref_deserializes_both_shapes() {
        let plain: EvidenceRef = serde_json::from_value(json!("https://a")).unwrap();
        assert_eq!(plain.url(), "https://a");
        let typed: EvidenceRef =
            serde_json::from_value(json!({"url": "https://b", "docType": "memo"})).unwrap();
        assert_eq!(typed.tag(), Some("memo"));
    }

    #[test]
    fn evidence_set_iterates_in_kind_order() {
        let set = EvidenceSet::default()
            .with_url(DocKind::Other, "o1")
            .with_url(DocKind::Slip, "s1")
            .with_url(DocKind::Withholding, "w1")
            .with_url(DocKind::Slip, "s2");
        let order: Vec<(DocKind, &str)> = set.iter().map(|(k, e)| (k, e.url())).collect();
        assert_eq!(
            order,
            vec![
                (DocKind::Slip, "s1"),
                (DocKind::Slip, "s2"),
                (DocKind::Withholding, "w1"),
                (DocKind::Other, "o1"),
            ]
        );
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn amounts_sum() {
        let a = Amounts::from_parts(dec!(100), dec!(7), dec!(3));
        let b = Amounts::from_parts(dec!(50), dec!(3.5), dec!(0));
        assert_eq!(a.net, dec!(104));
        let total: Amounts = [a, b].into_iter().sum();
        assert_eq!(total.base, dec!(150));
        assert_eq!(total.net, dec!(157.5));
    }
}
