//! Persistence for generated dossier reports.
//!
//! Three append-friendly tables back the pipeline:
//!
//! - `reports`: the single mutable current view per `report_id`
//! - `report_versions`: immutable payload snapshots
//! - `audit_logs`: who did what, when
//!
//! Inserts are idempotent on `report_id`, updates go through a typed
//! allow-list ([`ReportUpdate`]), and only [`ReportStore::snapshot`] moves
//! the version number. `redaction_count` is always recomputed from the
//! stored payload.
//!
//! # Example
//!
//! ```
//! use dossier_common::Document;
//! use dossier_config::RetentionConfig;
//! use dossier_store::{NewReport, ReportStore};
//! use serde_json::json;
//!
//! let store = ReportStore::open_in_memory(RetentionConfig::default()).unwrap();
//! let doc = Document::from_value(json!({"summary": "Seen in ||Berlin||"})).unwrap();
//! let outcome = store.insert(NewReport::from_document("R-1", &doc)).unwrap();
//! assert_eq!(outcome.record().redaction_count, 1);
//! assert_eq!(outcome.record().version, 1);
//! ```

pub mod error;
pub mod model;
pub mod store;

pub use error::{Result, StoreError};
pub use model::{
    AuditEvent, DeleteOutcome, InsertOutcome, NewAuditEvent, NewReport, ReportFilter,
    ReportRecord, ReportUpdate, ReportVersion, StoreStatistics, SUMMARY_MAX_CHARS,
};
pub use store::{ReportStore, SEARCH_LIMIT};
