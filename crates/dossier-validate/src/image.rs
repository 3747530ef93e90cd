//! Pre-flight checks for image files before they reach the sanitizer.

use dossier_common::ValidationResult;
use std::path::Path;

/// Limits applied to incoming image files.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageLimits {
    /// Maximum file size in bytes.
    pub max_file_bytes: u64,
    /// Lower-case extensions without the dot.
    pub allowed_extensions: Vec<String>,
    /// Smallest acceptable width/height in pixels.
    pub min_dimension: u32,
    /// Largest acceptable width/height in pixels.
    pub max_dimension: u32,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 50 * 1024 * 1024,
            allowed_extensions: ["jpg", "jpeg", "png", "webp", "gif"]
                .into_iter()
                .map(String::from)
                .collect(),
            min_dimension: 100,
            max_dimension: 4000,
        }
    }
}

/// Check that a file exists, has an accepted extension and fits the size cap.
pub fn validate_image_file(path: &Path, limits: &ImageLimits) -> ValidationResult {
    let mut result = ValidationResult::valid();

    let metadata = match std::fs::metadata(path) {
        Ok(m) if m.is_file() => m,
        _ => {
            result.add_error(format!("File does not exist: {}", path.display()));
            return result;
        }
    };

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !limits.allowed_extensions.iter().any(|a| *a == ext) {
        result.add_error(format!(
            "Invalid file type: .{ext}. Allowed: {}",
            limits.allowed_extensions.join(", ")
        ));
    }

    if metadata.len() > limits.max_file_bytes {
        result.add_error(format!(
            "File too large: {:.1}MB. Maximum: {:.0}MB",
            metadata.len() as f64 / (1024.0 * 1024.0),
            limits.max_file_bytes as f64 / (1024.0 * 1024.0)
        ));
    }

    result.with_sanitized("size_bytes", metadata.len())
}

/// Check decoded dimensions against the configured bounds.
pub fn validate_image_dimensions(width: u32, height: u32, limits: &ImageLimits) -> ValidationResult {
    let mut result = ValidationResult::valid();

    if width < limits.min_dimension || height < limits.min_dimension {
        result.add_error(format!(
            "Image too small: {width}x{height}. Minimum: {0}x{0}",
            limits.min_dimension
        ));
    }
    if width > limits.max_dimension || height > limits.max_dimension {
        result.add_error(format!(
            "Image too large: {width}x{height}. Maximum: {0}x{0}",
            limits.max_dimension
        ));
    }

    result
}
