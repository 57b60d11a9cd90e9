//! In-memory transaction source.
//!
//! Holds companies and their records behind a `parking_lot::RwLock`; no
//! lock is held across an `.await`. Records are filtered to the requested
//! period on read and returned in `(date, insertion)` order, matching what
//! the Postgres source returns.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use billbook_core::{
    CompanyId, CompanyProfile, ExportPeriod, SourceError, TransactionKind, TransactionRecord, TransactionSet,
    TransactionSource,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default)]
struct Books {
    companies: HashMap<CompanyId, CompanyProfile>,
    records: HashMap<CompanyId, Vec<TransactionRecord>>,
    deleted: HashSet<uuid::Uuid>,
}

/// Thread-safe, cloneable in-memory [`TransactionSource`].
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    books: Arc<RwLock<Books>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a company.
    pub fn insert_company(&self, company: CompanyProfile) {
        self.books.write().companies.insert(company.id, company);
    }

    /// Append a record to a company's books.
    pub fn insert_record(&self, company_id: CompanyId, record: TransactionRecord) {
        self.books.write().records.entry(company_id).or_default().push(record);
    }

    /// Mark a record deleted. It stays stored but exports no longer see it.
    ///
    /// Returns `false` if the company has no such live record.
    pub fn soft_delete(&self, company_id: CompanyId, record_id: uuid::Uuid) -> bool {
        let mut books = self.books.write();
        let known = books
            .records
            .get(&company_id)
            .is_some_and(|records| records.iter().any(|r| r.id == record_id));
        known && books.deleted.insert(record_id)
    }

    /// Records stored for a company, deleted ones included.
    pub fn stored_len(&self, company_id: CompanyId) -> usize {
        self.books.read().records.get(&company_id).map_or(0, Vec::len)
    }

    /// Build a source from a parsed fixture.
    pub fn from_fixture(fixture: Fixture) -> Self {
        let source = Self::new();
        for entry in fixture.companies {
            let id = entry.company.id;
            source.insert_company(entry.company);
            for mut record in entry.expenses {
                record.kind = TransactionKind::Expense;
                source.insert_record(id, record);
            }
            for mut record in entry.incomes {
                record.kind = TransactionKind::Income;
                source.insert_record(id, record);
            }
        }
        source
    }

    /// Parse a JSON fixture (see [`Fixture`]).
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::from_fixture(serde_json::from_str(json)?))
    }
}

/// JSON fixture layout: a list of companies with their records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    pub companies: Vec<FixtureCompany>,
}

/// One company in a [`Fixture`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureCompany {
    #[serde(flatten)]
    pub company: CompanyProfile,
    #[serde(default)]
    pub expenses: Vec<TransactionRecord>,
    #[serde(default)]
    pub incomes: Vec<TransactionRecord>,
}

#[async_trait]
impl TransactionSource for MemorySource {
    async fn company(&self, company_id: CompanyId) -> Result<Option<CompanyProfile>, SourceError> {
        Ok(self.books.read().companies.get(&company_id).cloned())
    }

    async fn fetch_transactions(
        &self,
        company_id: CompanyId,
        period: &ExportPeriod,
    ) -> Result<TransactionSet, SourceError> {
        let books = self.books.read();
        let mut set = TransactionSet::default();
        let Some(records) = books.records.get(&company_id) else {
            return Ok(set);
        };
        let live = records
            .iter()
            .filter(|r| !books.deleted.contains(&r.id) && period.contains(r.date));
        for record in live {
            match record.kind {
                TransactionKind::Expense => set.expenses.push(record.clone()),
                TransactionKind::Income => set.incomes.push(record.clone()),
            }
        }
        // stable: equal dates keep insertion order
        set.expenses.sort_by_key(|r| r.date);
        set.incomes.sort_by_key(|r| r.date);
        Ok(set)
    }
}
