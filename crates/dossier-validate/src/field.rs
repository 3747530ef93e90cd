//! String field validators.
//!
//! Every validator sanitizes first and reports the normalized value under
//! `sanitized_data["value"]` when the input is acceptable.

use crate::sanitize::{
    sanitize_input, MAX_NAME_LENGTH, MAX_SHORT_TEXT, MAX_TEXT_LENGTH, MIN_NAME_LENGTH,
};
use dossier_common::ValidationResult;
use once_cell::sync::Lazy;
use regex::Regex;
use std::net::IpAddr;

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_URL_LENGTH: usize = 2048;
const MAX_CODE_LENGTH: usize = 10;

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\p{L}\s\-'.]+$").unwrap());

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}$").unwrap());

static PHONE_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-().]").unwrap());

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?\d{9,15}$").unwrap());

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^https?://(?:www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b[-a-zA-Z0-9()@:%_+.~#?&/=]*$",
    )
    .unwrap()
});

static RELIABILITY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-F][1-4]$").unwrap());

/// Length class for free-text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    /// Headlines, labels, single-line values.
    Short,
    /// Narrative paragraphs.
    Long,
}

impl TextKind {
    pub fn max_chars(self) -> usize {
        match self {
            TextKind::Short => MAX_SHORT_TEXT,
            TextKind::Long => MAX_TEXT_LENGTH,
        }
    }
}

/// Validate a personal name.
pub fn validate_name(name: &str) -> ValidationResult {
    let mut result = ValidationResult::valid();

    if name.trim().is_empty() {
        result.add_error("Name is required");
        return result;
    }

    let value = sanitize_input(name, MAX_NAME_LENGTH);
    let len = value.chars().count();
    if len < MIN_NAME_LENGTH {
        result.add_error(format!(
            "Name must be at least {MIN_NAME_LENGTH} characters"
        ));
    }
    if name.trim().chars().count() > MAX_NAME_LENGTH {
        result.add_warning(format!(
            "Name truncated to {MAX_NAME_LENGTH} characters"
        ));
    }
    if !NAME_RE.is_match(&value) {
        result.add_error("Name contains invalid characters");
    }

    result.with_sanitized("value", value)
}

/// Validate an email address; the normalized value is lower-cased.
pub fn validate_email(email: &str) -> ValidationResult {
    let mut result = ValidationResult::valid();

    if email.trim().is_empty() {
        result.add_error("Email is required");
        return result;
    }

    let value = sanitize_input(email, MAX_EMAIL_LENGTH + 1).to_lowercase();
    if value.chars().count() > MAX_EMAIL_LENGTH {
        result.add_error(format!(
            "Email exceeds maximum length of {MAX_EMAIL_LENGTH} characters"
        ));
        return result;
    }
    if !EMAIL_RE.is_match(&value) {
        result.add_error("Invalid email format");
        return result;
    }

    result.with_sanitized("value", value)
}

/// Validate a phone number. Separators are stripped before matching.
pub fn validate_phone(phone: &str) -> ValidationResult {
    let mut result = ValidationResult::valid();

    if phone.trim().is_empty() {
        result.add_error("Phone number is required");
        return result;
    }

    let value = PHONE_SEPARATORS.replace_all(phone.trim(), "").into_owned();
    if !PHONE_RE.is_match(&value) {
        result.add_error("Invalid phone number format");
        return result;
    }

    result.with_sanitized("value", value)
}

/// Validate an IPv4 or IPv6 address.
pub fn validate_ip(ip: &str) -> ValidationResult {
    let mut result = ValidationResult::valid();

    let value = ip.trim();
    if value.is_empty() {
        result.add_error("IP address is required");
        return result;
    }

    match value.parse::<IpAddr>() {
        Ok(addr) => result.with_sanitized("value", addr.to_string()),
        Err(_) => {
            result.add_error("Invalid IP address format");
            result
        }
    }
}

/// Validate an http(s) URL with a host.
pub fn validate_url(url: &str) -> ValidationResult {
    let mut result = ValidationResult::valid();

    let value = url.trim();
    if value.is_empty() {
        result.add_error("URL is required");
        return result;
    }
    if value.chars().count() > MAX_URL_LENGTH {
        result.add_error(format!(
            "URL exceeds maximum length of {MAX_URL_LENGTH} characters"
        ));
        return result;
    }
    if !URL_RE.is_match(value) {
        result.add_error("Invalid URL format");
        return result;
    }

    result.with_sanitized("value", value.to_string())
}

/// Validate a source reliability code (`A1`..`F4`).
pub fn validate_reliability_code(code: &str) -> ValidationResult {
    let mut result = ValidationResult::valid();

    let value = sanitize_input(code, MAX_CODE_LENGTH).to_uppercase();
    if value.is_empty() {
        result.add_error("Admiralty code is required");
        return result;
    }
    if !RELIABILITY_RE.is_match(&value) {
        result.add_error(format!(
            "Invalid Admiralty code: {value}. Must be a letter A-F followed by a digit 1-4"
        ));
        return result;
    }

    result.with_sanitized("value", value)
}

/// Sanitize free text to its length class. Empty text is valid.
pub fn validate_text(text: &str, kind: TextKind) -> ValidationResult {
    let mut result = ValidationResult::valid();
    let max = kind.max_chars();
    let value = sanitize_input(text, max);

    if text.trim().chars().count() > max {
        result.add_warning(format!("Text truncated to {max} characters"));
    }
    result.with_sanitized("value", value)
}
