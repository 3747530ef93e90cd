//! Configuration types.
//!
//! Every section deserializes from an empty table, so a config file only needs
//! the keys it changes.

use crate::validate::ConfigError;
use dossier_redact::RedactionPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable names for overrides.
pub const ENV_DB_PATH: &str = "DOSSIER_DB_PATH";
pub const ENV_PDF_ENCRYPT: &str = "DOSSIER_PDF_ENCRYPT";
pub const ENV_DEFAULT_TEMPLATE: &str = "DOSSIER_DEFAULT_TEMPLATE";
pub const ENV_OUTPUT_DIR: &str = "DOSSIER_OUTPUT_DIR";

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DossierConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub pdf: PdfConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub templates: TemplateConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub images: ImageConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub redaction: RedactionPolicy,
}

fn default_schema_version() -> String {
    crate::CONFIG_SCHEMA_VERSION.to_string()
}

impl Default for DossierConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            security: SecurityConfig::default(),
            pdf: PdfConfig::default(),
            database: DatabaseConfig::default(),
            templates: TemplateConfig::default(),
            retention: RetentionConfig::default(),
            pipeline: PipelineConfig::default(),
            images: ImageConfig::default(),
            paths: PathsConfig::default(),
            logging: LoggingConfig::default(),
            redaction: RedactionPolicy::default(),
        }
    }
}

/// Encryption, metadata stripping and audit switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Encrypt generated PDFs unless the request says otherwise.
    #[serde(default)]
    pub encrypt_by_default: bool,

    /// Password used when encryption is requested without one.
    #[serde(default = "default_password")]
    pub default_password: String,

    /// Strip embedded image metadata unless the request says otherwise.
    #[serde(default = "default_true")]
    pub strip_exif: bool,

    /// Write audit events for store mutations.
    #[serde(default = "default_true")]
    pub audit_logging: bool,
}

fn default_password() -> String {
    "CLASSIFIED".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            encrypt_by_default: false,
            default_password: default_password(),
            strip_exif: true,
            audit_logging: true,
        }
    }
}

/// Page geometry and watermark settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Only `A4` is supported.
    pub page_size: String,
    pub margin_top_cm: f32,
    pub margin_bottom_cm: f32,
    pub margin_left_cm: f32,
    pub margin_right_cm: f32,
    /// Resolution images are assumed to be authored at.
    pub dpi: u32,
    pub enable_watermark: bool,
    /// Watermark text used when a request supplies none.
    pub watermark_text: Option<String>,
    pub watermark_opacity: f32,
    /// Rotation in degrees, counter-clockwise positive.
    pub watermark_angle: f32,
    pub watermark_font_size: f32,
    pub body_font_size: f32,
    /// Deflate page content streams.
    pub compress: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            page_size: "A4".to_string(),
            margin_top_cm: 1.5,
            margin_bottom_cm: 1.5,
            margin_left_cm: 1.5,
            margin_right_cm: 1.5,
            dpi: 300,
            enable_watermark: true,
            watermark_text: None,
            watermark_opacity: 0.15,
            watermark_angle: -45.0,
            watermark_font_size: 60.0,
            body_font_size: 10.0,
            compress: true,
        }
    }
}

/// SQLite store location and connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    /// How long a writer waits on a locked database before failing.
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("database/dossier.db"),
            busy_timeout_ms: 5_000,
        }
    }
}

/// Template selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Template used when a request names none or an unknown one.
    pub default_template: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            default_template: "dossier".to_string(),
        }
    }
}

/// What a report deletion takes with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Delete version history along with the report.
    pub cascade_versions: bool,
    /// Delete the report's audit events along with the report.
    pub cascade_audit: bool,
}

/// Orchestrator behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Delete the generated PDF when persisting its record fails.
    pub compensate_on_persist_failure: bool,
}

/// Image sanitizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Longest allowed side after resizing.
    pub max_dimension: u32,
    /// Quality of the metadata-free intermediate encode.
    pub intermediate_quality: u8,
    /// Quality of the final JPEG.
    pub output_quality: u8,
    pub grayscale: bool,
    pub max_file_size_mb: u64,
    pub allowed_extensions: Vec<String>,
    /// Advisory bounds reported by inspection.
    pub min_input_dimension: u32,
    pub max_input_dimension: u32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_dimension: 2000,
            intermediate_quality: 95,
            output_quality: 85,
            grayscale: true,
            max_file_size_mb: 50,
            allowed_extensions: ["jpg", "jpeg", "png", "webp", "gif"]
                .into_iter()
                .map(String::from)
                .collect(),
            min_input_dimension: 100,
            max_input_dimension: 4000,
        }
    }
}

/// Output locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Where PDFs go when the caller gives no explicit path.
    pub output_dir: PathBuf,
    /// Where sanitized images are written.
    pub processed_images_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            processed_images_dir: PathBuf::from("output/images"),
        }
    }
}

/// Logging defaults; CLI flags and `DOSSIER_LOG*` take precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `human` or `jsonl`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "human".to_string(),
        }
    }
}

impl DossierConfig {
    /// Load configuration from a file. `.json` files are parsed as JSON,
    /// everything else as TOML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read {}: {}", path.display(), e)))?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        debug!(path = %path.display(), json = is_json, "loading config file");
        if is_json {
            Self::parse_json(&content)
        } else {
            Self::parse_toml(&content)
        }
    }

    /// Parse configuration from a TOML string.
    pub fn parse_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(format!("Invalid TOML: {}", e)))
    }

    /// Parse configuration from a JSON string.
    pub fn parse_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(format!("Invalid JSON: {}", e)))
    }

    /// Apply `DOSSIER_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup; empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get(ENV_DB_PATH) {
            debug!(path = %path, "database path overridden from environment");
            self.database.path = PathBuf::from(path);
        }
        if let Some(flag) = get(ENV_PDF_ENCRYPT) {
            self.security.encrypt_by_default = parse_bool(ENV_PDF_ENCRYPT, &flag)?;
        }
        if let Some(template) = get(ENV_DEFAULT_TEMPLATE) {
            self.templates.default_template = template.trim().to_string();
        }
        if let Some(dir) = get(ENV_OUTPUT_DIR) {
            let dir = PathBuf::from(dir);
            self.paths.processed_images_dir = dir.join("images");
            self.paths.output_dir = dir;
        }
        Ok(())
    }

    /// Serialize back to TOML, e.g. for `--print-config` style output.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_toml_is_default() {
        let config = DossierConfig::parse_toml("").unwrap();
        assert_eq!(config.pdf.dpi, 300);
        assert_eq!(config.pdf.watermark_opacity, 0.15);
        assert_eq!(config.templates.default_template, "dossier");
        assert!(!config.retention.cascade_versions);
        assert_eq!(config.redaction.max_redactions_per_field, 1000);
        assert_eq!(config.schema_version, crate::CONFIG_SCHEMA_VERSION);
    }

    #[test]
    fn test_partial_section() {
        let config = DossierConfig::parse_toml(
            r#"
            [pdf]
            dpi = 150

            [retention]
            cascade_audit = true
            "#,
        )
        .unwrap();
        assert_eq!(config.pdf.dpi, 150);
        assert_eq!(config.pdf.margin_left_cm, 1.5);
        assert!(config.retention.cascade_audit);
        assert!(!config.retention.cascade_versions);
    }

    #[test]
    fn test_parse_json() {
        let config = DossierConfig::parse_json(r#"{"security": {"encrypt_by_default": true}}"#)
            .unwrap();
        assert!(config.security.encrypt_by_default);
        assert!(config.security.strip_exif);
    }

    #[test]
    fn test_parse_error() {
        let err = DossierConfig::parse_toml("[pdf\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_DB_PATH, "/tmp/x.db"),
            (ENV_PDF_ENCRYPT, "TRUE"),
            (ENV_DEFAULT_TEMPLATE, "scroll"),
            (ENV_OUTPUT_DIR, "/srv/out"),
        ]
        .into_iter()
        .collect();

        let mut config = DossierConfig::default();
        config
            .apply_overrides_from(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/x.db"));
        assert!(config.security.encrypt_by_default);
        assert_eq!(config.templates.default_template, "scroll");
        assert_eq!(config.paths.output_dir, PathBuf::from("/srv/out"));
        assert_eq!(
            config.paths.processed_images_dir,
            PathBuf::from("/srv/out/images")
        );
    }

    #[test]
    fn test_bad_bool_override() {
        let mut config = DossierConfig::default();
        let err = config
            .apply_overrides_from(|k| (k == ENV_PDF_ENCRYPT).then(|| "maybe".to_string()))
            .unwrap_err();
        assert_eq!(err.code(), 65);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = DossierConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(DossierConfig::parse_toml(&text).unwrap(), config);
    }
}
