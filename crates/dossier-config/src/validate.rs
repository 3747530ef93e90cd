//! Configuration errors and semantic validation.

use crate::config::DossierConfig;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ConfigError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ConfigError::Io(_) => 60,
            ConfigError::Parse(_) => 61,
            ConfigError::InvalidValue { .. } => 65,
            ConfigError::VersionMismatch { .. } => 66,
        }
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Validate a loaded configuration semantically.
pub fn validate_config(config: &DossierConfig) -> Result<(), ConfigError> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ConfigError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    validate_pdf(config)?;
    validate_images(config)?;

    if config.templates.default_template.trim().is_empty() {
        return Err(invalid("templates.default_template", "Must not be empty"));
    }
    if config.security.default_password.is_empty() {
        return Err(invalid("security.default_password", "Must not be empty"));
    }
    if config.redaction.css_class.trim().is_empty() {
        return Err(invalid("redaction.css_class", "Must not be empty"));
    }

    Ok(())
}

fn validate_pdf(config: &DossierConfig) -> Result<(), ConfigError> {
    let pdf = &config.pdf;

    if !pdf.page_size.eq_ignore_ascii_case("A4") {
        return Err(invalid(
            "pdf.page_size",
            format!("Only A4 is supported, got {}", pdf.page_size),
        ));
    }
    if !(72..=1200).contains(&pdf.dpi) {
        return Err(invalid(
            "pdf.dpi",
            format!("Must be in [72, 1200], got {}", pdf.dpi),
        ));
    }
    if !(0.0..=1.0).contains(&pdf.watermark_opacity) {
        return Err(invalid(
            "pdf.watermark_opacity",
            format!("Must be in [0, 1], got {}", pdf.watermark_opacity),
        ));
    }
    if pdf.watermark_font_size <= 0.0 || pdf.body_font_size <= 0.0 {
        return Err(invalid("pdf.font_size", "Font sizes must be positive"));
    }

    let margins = [
        ("pdf.margin_top_cm", pdf.margin_top_cm),
        ("pdf.margin_bottom_cm", pdf.margin_bottom_cm),
        ("pdf.margin_left_cm", pdf.margin_left_cm),
        ("pdf.margin_right_cm", pdf.margin_right_cm),
    ];
    for (field, value) in margins {
        // Anything beyond 8 cm leaves no printable width on A4.
        if !(0.0..8.0).contains(&value) {
            return Err(invalid(field, format!("Must be in [0, 8), got {}", value)));
        }
    }

    Ok(())
}

fn validate_images(config: &DossierConfig) -> Result<(), ConfigError> {
    let images = &config.images;

    if images.max_dimension == 0 {
        return Err(invalid("images.max_dimension", "Must be positive"));
    }
    for (field, q) in [
        ("images.intermediate_quality", images.intermediate_quality),
        ("images.output_quality", images.output_quality),
    ] {
        if !(1..=100).contains(&q) {
            return Err(invalid(field, format!("Must be in [1, 100], got {}", q)));
        }
    }
    if images.min_input_dimension > images.max_input_dimension {
        return Err(invalid(
            "images.min_input_dimension",
            "Must not exceed images.max_input_dimension",
        ));
    }
    if images.allowed_extensions.is_empty() {
        return Err(invalid("images.allowed_extensions", "Must not be empty"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        validate_config(&DossierConfig::default()).unwrap();
    }

    #[test]
    fn test_rejects_opacity_out_of_range() {
        let mut config = DossierConfig::default();
        config.pdf.watermark_opacity = 1.5;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "pdf.watermark_opacity"));
    }

    #[test]
    fn test_rejects_letter_page() {
        let mut config = DossierConfig::default();
        config.pdf.page_size = "Letter".into();
        assert_eq!(validate_config(&config).unwrap_err().code(), 65);
    }

    #[test]
    fn test_rejects_version_mismatch() {
        let mut config = DossierConfig::default();
        config.schema_version = "0.9.0".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_quality() {
        let mut config = DossierConfig::default();
        config.images.output_quality = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_error_codes_distinct() {
        let codes = [
            ConfigError::Io(String::new()).code(),
            ConfigError::Parse(String::new()).code(),
            invalid("x", "y").code(),
            ConfigError::VersionMismatch {
                expected: String::new(),
                actual: String::new(),
            }
            .code(),
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }
}
