//! Field and document validators.
//!
//! Field validators take a raw string and always return a
//! [`ValidationResult`](dossier_common::ValidationResult); malformed input is
//! reported, never raised. Document validators accumulate every problem in a
//! payload before returning so callers see the full list at once.

pub mod date;
pub mod document;
pub mod field;
pub mod image;
pub mod sanitize;

pub use date::{validate_date, validate_date_range, DATE_FORMATS};
pub use document::DocumentValidator;
pub use field::{
    validate_email, validate_ip, validate_name, validate_phone, validate_reliability_code,
    validate_text, validate_url, TextKind,
};
pub use image::{validate_image_dimensions, validate_image_file, ImageLimits};
pub use sanitize::{sanitize_input, MAX_NAME_LENGTH, MAX_SHORT_TEXT, MAX_TEXT_LENGTH};
