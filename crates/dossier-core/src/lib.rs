//! Dossier report pipeline.
//!
//! This library sequences the workspace crates into one pipeline:
//! - [`ReportEngine`]: validate, sanitize images, count redactions, render,
//!   write the PDF and persist the record
//! - [`logging`]: tracing subscriber setup shared by the CLI
//! - [`exit_codes`]: stable process exit codes
//!
//! The `dossier` binary entry point is in `main.rs`.
//!
//! # Example
//!
//! ```no_run
//! use dossier_common::Document;
//! use dossier_config::DossierConfig;
//! use dossier_core::{GenerateRequest, ReportEngine};
//! use std::path::Path;
//!
//! let engine = ReportEngine::open(DossierConfig::default())?;
//! let doc = Document::load(Path::new("jane_doe.yaml"))?;
//! let report = engine.generate(GenerateRequest::new(doc).with_encryption(true))?;
//! println!("{} -> {}", report.report_id, report.pdf.path.display());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod identity;
pub mod logging;
pub mod model;

pub use engine::ReportEngine;
pub use error::{GenerationError, Stage};
pub use exit_codes::ExitCode;
pub use identity::{derive_report_id, pdf_file_name};
pub use model::{
    BatchItem, BatchResult, GenerateRequest, GeneratedReport, PersistenceStatus,
};
