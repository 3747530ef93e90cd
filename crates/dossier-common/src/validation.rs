//! Validation outcome shared by every validator.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result of a validation operation.
///
/// Validators never return `Err` for malformed input: problems land in
/// `errors` (which clears `is_valid`) or `warnings` (which does not).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Normalized values keyed by field name (e.g. `"date" -> "2024-01-31"`).
    #[serde(default)]
    pub sanitized_data: Map<String, Value>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::valid()
    }
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            sanitized_data: Map::new(),
        }
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.is_valid = false;
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn with_sanitized(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.sanitized_data.insert(key.to_string(), value.into());
        self
    }

    /// The sanitized string stored under `key`, if any.
    pub fn sanitized_str(&self, key: &str) -> Option<&str> {
        self.sanitized_data.get(key).and_then(Value::as_str)
    }

    /// Fold another result in, prefixing its messages.
    ///
    /// Errors from `other` invalidate `self`; sanitized data is not carried
    /// over because keys would collide across fields.
    pub fn absorb(&mut self, prefix: &str, other: ValidationResult) {
        for e in other.errors {
            self.add_error(format!("{prefix}{e}"));
        }
        for w in other.warnings {
            self.add_warning(format!("{prefix}{w}"));
        }
    }

    /// Merge without prefixing.
    pub fn merge(&mut self, other: ValidationResult) {
        self.absorb("", other);
    }
}
