//! # Export Requests
//!
//! The validated input of one archive export. Constructed once per
//! invocation and never persisted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::period::{ExportPeriod, YearCalendar};

/// Lowest display year accepted from callers.
pub const MIN_DISPLAY_YEAR: i32 = 1900;

/// Highest display year accepted from callers (Buddhist era headroom).
pub const MAX_DISPLAY_YEAR: i32 = 3000;

/// Unique identifier for a company (tenant) whose books are exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub Uuid);

impl CompanyId {
    /// Generate a new random company identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CompanyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CompanyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for CompanyId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// A request to export one company's documents for one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportRequest {
    company_id: CompanyId,
    month: u32,
    year: i32,
}

impl ExportRequest {
    /// Validate and build a request. `year` is in the caller's calendar.
    pub fn new(company_id: CompanyId, month: u32, year: i32) -> Result<Self, CoreError> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::validation(
                "month",
                format!("expected 1-12, got {month}"),
            ));
        }
        if !(MIN_DISPLAY_YEAR..=MAX_DISPLAY_YEAR).contains(&year) {
            return Err(CoreError::validation(
                "year",
                format!("expected {MIN_DISPLAY_YEAR}-{MAX_DISPLAY_YEAR}, got {year}"),
            ));
        }
        Ok(Self {
            company_id,
            month,
            year,
        })
    }

    /// Company whose books are exported.
    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    /// Month number, 1–12.
    pub fn month(&self) -> u32 {
        self.month
    }

    /// Year in the caller's calendar.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Resolve the storage-calendar interval for this request.
    pub fn period(&self, calendar: YearCalendar) -> Result<ExportPeriod, CoreError> {
        ExportPeriod::resolve(self.month, self.year, calendar)
    }
}
