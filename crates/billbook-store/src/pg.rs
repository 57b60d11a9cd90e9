//! PostgreSQL transaction source.
//!
//! Expenses and incomes live in two tables with the same column layout.
//! Each is read with one query per export: rows of the company inside the
//! period, soft-deleted rows excluded, counterparty resolved through
//! `contacts`, ordered by `(issue_date, created_at, id)`.

use async_trait::async_trait;
use billbook_core::{
    Amounts, CompanyId, CompanyProfile, DocKind, EvidenceRef, EvidenceSet, ExportPeriod, SourceError,
    TransactionKind, TransactionRecord, TransactionSet, TransactionSource,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// [`TransactionSource`] over a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgTransactionSource {
    pool: PgPool,
}

impl PgTransactionSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn records(
        &self,
        kind: TransactionKind,
        company_id: CompanyId,
        period: &ExportPeriod,
    ) -> Result<Vec<TransactionRecord>, SourceError> {
        let rows = sqlx::query_as::<_, TransactionRow>(select_transactions(kind))
            .bind(company_id.0)
            .bind(period.start_date())
            .bind(period.end_date())
            .fetch_all(&self.pool)
            .await
            .map_err(query_error(table(kind)))?;

        Ok(rows.into_iter().map(|row| row.into_record(kind)).collect())
    }
}

#[async_trait]
impl TransactionSource for PgTransactionSource {
    async fn company(&self, company_id: CompanyId) -> Result<Option<CompanyProfile>, SourceError> {
        let row = sqlx::query_as::<_, CompanyRow>(
            "SELECT id, code, name, tax_id FROM companies WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(company_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error("companies"))?;

        Ok(row.map(CompanyRow::into_profile))
    }

    async fn fetch_transactions(
        &self,
        company_id: CompanyId,
        period: &ExportPeriod,
    ) -> Result<TransactionSet, SourceError> {
        let expenses = self.records(TransactionKind::Expense, company_id, period).await?;
        let incomes = self.records(TransactionKind::Income, company_id, period).await?;
        tracing::debug!(
            company = %company_id,
            from = %period.start_date(),
            to = %period.end_date(),
            expenses = expenses.len(),
            incomes = incomes.len(),
            "fetched transactions"
        );
        Ok(TransactionSet { expenses, incomes })
    }
}

fn table(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Expense => "expenses",
        TransactionKind::Income => "incomes",
    }
}

fn select_transactions(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Expense => concat!(
            "SELECT t.id, t.issue_date, COALESCE(c.name, t.counterparty_name, '') AS counterparty_name, ",
            "c.tax_id AS counterparty_tax_id, t.description, t.invoice_number, ",
            "t.amount, t.vat_amount, t.wht_amount, t.wht_rate, t.net_amount, t.status, ",
            "t.slip_urls, t.tax_invoice_urls, t.wht_cert_urls, t.bill_urls, t.other_docs ",
            "FROM expenses t LEFT JOIN contacts c ON c.id = t.contact_id ",
            "WHERE t.company_id = $1 AND t.deleted_at IS NULL ",
            "AND t.issue_date >= $2 AND t.issue_date <= $3 ",
            "ORDER BY t.issue_date, t.created_at, t.id"
        ),
        TransactionKind::Income => concat!(
            "SELECT t.id, t.issue_date, COALESCE(c.name, t.counterparty_name, '') AS counterparty_name, ",
            "c.tax_id AS counterparty_tax_id, t.description, t.invoice_number, ",
            "t.amount, t.vat_amount, t.wht_amount, t.wht_rate, t.net_amount, t.status, ",
            "t.slip_urls, t.tax_invoice_urls, t.wht_cert_urls, t.bill_urls, t.other_docs ",
            "FROM incomes t LEFT JOIN contacts c ON c.id = t.contact_id ",
            "WHERE t.company_id = $1 AND t.deleted_at IS NULL ",
            "AND t.issue_date >= $2 AND t.issue_date <= $3 ",
            "ORDER BY t.issue_date, t.created_at, t.id"
        ),
    }
}

fn query_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> SourceError {
    move |e| {
        tracing::error!(operation, error = %e, "transaction query failed");
        SourceError::Query {
            operation,
            message: e.to_string(),
        }
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct CompanyRow {
    id: Uuid,
    code: String,
    name: String,
    tax_id: Option<String>,
}

impl CompanyRow {
    fn into_profile(self) -> CompanyProfile {
        CompanyProfile {
            id: CompanyId(self.id),
            code: self.code,
            name: self.name,
            tax_id: self.tax_id,
        }
    }
}

/// Internal row type for SQLx mapping. Shared by `expenses` and `incomes`.
#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    issue_date: NaiveDate,
    counterparty_name: String,
    counterparty_tax_id: Option<String>,
    description: Option<String>,
    invoice_number: Option<String>,
    amount: Decimal,
    vat_amount: Decimal,
    wht_amount: Decimal,
    wht_rate: Option<Decimal>,
    net_amount: Option<Decimal>,
    status: String,
    slip_urls: Option<serde_json::Value>,
    tax_invoice_urls: Option<serde_json::Value>,
    wht_cert_urls: Option<serde_json::Value>,
    bill_urls: Option<serde_json::Value>,
    other_docs: Option<serde_json::Value>,
}

impl TransactionRow {
    fn into_record(self, kind: TransactionKind) -> TransactionRecord {
        let mut amounts = Amounts::from_parts(self.amount, self.vat_amount, self.wht_amount);
        if let Some(net) = self.net_amount {
            amounts.net = net;
        }

        let mut evidence = EvidenceSet::default();
        for (doc, column) in [
            (DocKind::Slip, &self.slip_urls),
            (DocKind::Invoice, &self.tax_invoice_urls),
            (DocKind::Withholding, &self.wht_cert_urls),
            (DocKind::Bill, &self.bill_urls),
            (DocKind::Other, &self.other_docs),
        ] {
            if let Some(value) = column {
                for item in EvidenceRef::normalize_list(value) {
                    evidence.push(doc, item);
                }
            }
        }

        TransactionRecord {
            id: self.id,
            kind,
            date: self.issue_date,
            counterparty_name: self.counterparty_name,
            counterparty_tax_id: self.counterparty_tax_id,
            description: self.description,
            invoice_number: self.invoice_number,
            amounts,
            wht_rate: self.wht_rate,
            status: self.status,
            evidence,
        }
    }
}
