//! Shared types for the dossier pipeline.
//!
//! This crate provides:
//! - [`Document`]: the nested intelligence record every stage operates on
//! - [`ValidationResult`]: the non-throwing outcome of field and document checks
//! - Alias tables for fields that arrive under more than one spelling

pub mod alias;
pub mod document;
pub mod error;
pub mod validation;

pub use alias::{first_non_empty, FieldAliases};
pub use document::{section_names, Document};
pub use error::{DocumentError, Result};
pub use validation::ValidationResult;

/// Schema version for persisted payloads and CLI output.
pub const SCHEMA_VERSION: &str = "1.0.0";
