//! # billbook-core — Foundational Types for the Archive Export
//!
//! Defines the domain primitives shared by every billbook crate: the
//! validated export request, the period resolver, transaction and evidence
//! records, the data-source boundary, and the archive path allocator.
//! Every other crate in the workspace depends on `billbook-core`; it
//! depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Validated constructors.** `ExportRequest::new` rejects out-of-range
//!    months and years, so the period resolver never sees them.
//!
//! 2. **Normalize at the boundary.** Stored evidence lists mix bare URL
//!    strings and tagged objects. They become `EvidenceRef` values once,
//!    when rows are loaded, and nowhere else.
//!
//! 3. **No global state.** Name-collision counters live inside a
//!    `PathAllocator` value owned by a single archive build.
//!
//! 4. **Deterministic traversal.** Expenses before incomes, record order,
//!    then evidence-kind order. Paths and collision suffixes are a pure
//!    function of the record set.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `billbook-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod naming;
pub mod period;
pub mod record;
pub mod request;
pub mod source;

// Re-export primary types for ergonomic imports.
pub use error::{CoreError, SourceError};
pub use naming::{folder_for, name_for, sanitize_component, NameCollisionTable, PathAllocator};
pub use period::{ExportPeriod, YearCalendar, BUDDHIST_ERA_OFFSET};
pub use record::{
    Amounts, CompanyProfile, DocKind, EvidenceRef, EvidenceSet, TransactionKind, TransactionRecord,
    TransactionSet,
};
pub use request::{CompanyId, ExportRequest};
pub use source::TransactionSource;
