//! Redaction span engine for dossier documents.
//!
//! Any text field may embed `||sensitive text||`. The literal text stays in
//! storage; rendering wraps it so it can be visually obliterated, and the
//! pipeline counts spans across the whole document for the report record.
//!
//! # Key Features
//!
//! - **Marking**: [`RedactionEngine::apply`] rewrites spans into tagged markup.
//! - **Accounting**: [`RedactionEngine::stats`] walks nested payloads and reports
//!   totals plus a per-path breakdown.
//! - **Layout support**: [`find_spans`] exposes byte ranges so non-HTML
//!   renderers can draw redaction bars.
//!
//! Markers do not nest and cannot be escaped. An odd trailing marker is
//! dropped silently rather than treated as an error.
//!
//! # Example
//!
//! ```
//! use dossier_redact::RedactionEngine;
//!
//! let engine = RedactionEngine::default();
//! assert_eq!(engine.count("Met ||Source A|| in ||Vienna||"), 2);
//! ```

pub mod engine;
pub mod marker;
pub mod policy;
pub mod stats;

pub use engine::{escape_html, RedactionEngine};
pub use marker::{find_spans, MarkerSpan, MARKER};
pub use policy::RedactionPolicy;
pub use stats::RedactionStats;
