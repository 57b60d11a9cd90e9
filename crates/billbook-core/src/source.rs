//! # Transaction Source Boundary
//!
//! The archive export reads its data through [`TransactionSource`]. The
//! trait is object-safe so the HTTP layer can hold any implementation
//! behind an `Arc<dyn TransactionSource>`.
//!
//! Implementations must return fully materialized record sets: report
//! totals need every record before the first byte is streamed.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::period::ExportPeriod;
use crate::record::{CompanyProfile, TransactionSet};
use crate::request::CompanyId;

/// Read access to companies and their period-scoped transactions.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Look up a company. `Ok(None)` means it does not exist.
    async fn company(&self, company_id: CompanyId) -> Result<Option<CompanyProfile>, SourceError>;

    /// Every non-deleted expense and income of `company_id` dated within
    /// `period`, ordered by date then creation order.
    async fn fetch_transactions(
        &self,
        company_id: CompanyId,
        period: &ExportPeriod,
    ) -> Result<TransactionSet, SourceError>;
}

#[async_trait]
impl<T: TransactionSource + ?Sized> TransactionSource for Arc<T> {
    async fn company(&self, company_id: CompanyId) -> Result<Option<CompanyProfile>, SourceError> {
        (**self).company(company_id).await
    }

    async fn fetch_transactions(
        &self,
        company_id: CompanyId,
        period: &ExportPeriod,
    ) -> Result<TransactionSet, SourceError> {
        (**self).fetch_transactions(company_id, period).await
    }
}
