//! Dossier pipeline configuration loading and validation.
//!
//! This crate provides:
//! - Typed structs for every component's settings ([`DossierConfig`])
//! - Config resolution (CLI → env → XDG → defaults)
//! - Environment overrides and semantic validation
//! - Reference tables for classification levels, TLP levels and source
//!   reliability codes
//!
//! Configuration is built once by the caller and passed down by reference;
//! nothing here is global.

pub mod config;
pub mod resolve;
pub mod tables;
pub mod validate;

pub use config::{
    DatabaseConfig, DossierConfig, ImageConfig, LoggingConfig, PathsConfig, PdfConfig,
    PipelineConfig, RetentionConfig, SecurityConfig, TemplateConfig,
};
pub use resolve::{load_config, resolve_config_path, ConfigSource};
pub use tables::{classification, reliability, tlp, ClassificationLevel, Reliability, TlpLevel};
pub use validate::{validate_config, ConfigError};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
