//! Date validation and normalization.

use chrono::{Local, NaiveDate};
use dossier_common::ValidationResult;

/// Accepted input formats, tried in order. The first successful parse wins.
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d", "%d.%m.%Y", "%Y.%m.%d",
];

/// Parse a date in any accepted format.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Validate a date string and normalize it to `YYYY-MM-DD`.
///
/// The normalized value is stored under `sanitized_data["date"]`. A date after
/// today is accepted with a warning.
pub fn validate_date(text: &str) -> ValidationResult {
    validate_date_on(text, Local::now().date_naive())
}

/// [`validate_date`] against an explicit "today", for deterministic callers.
pub fn validate_date_on(text: &str, today: NaiveDate) -> ValidationResult {
    let mut result = ValidationResult::valid();

    if text.trim().is_empty() {
        result.add_error("Date is required");
        return result;
    }

    let Some(date) = parse_date(text) else {
        result.add_error(format!(
            "Invalid date format: {}. Use YYYY-MM-DD",
            text.trim()
        ));
        return result;
    };

    if date > today {
        result.add_warning("Date appears to be in the future");
    }

    result.with_sanitized("date", date.format("%Y-%m-%d").to_string())
}

/// Validate both ends of a range and require `start <= end`.
///
/// Normalized values are stored as `start_date` and `end_date`.
pub fn validate_date_range(start: &str, end: &str) -> ValidationResult {
    let mut result = ValidationResult::valid();

    let start_result = validate_date(start);
    let end_result = validate_date(end);
    let start_iso = start_result.sanitized_str("date").map(str::to_string);
    let end_iso = end_result.sanitized_str("date").map(str::to_string);

    result.absorb("Start date: ", start_result);
    result.absorb("End date: ", end_result);

    if let (Some(s), Some(e)) = (start_iso, end_iso) {
        // ISO strings order the same way as the dates they encode.
        if s > e {
            result.add_error("Start date must be before end date");
        }
        result = result
            .with_sanitized("start_date", s)
            .with_sanitized("end_date", e);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_all_formats_normalize() {
        for input in [
            "1990-01-15",
            "15-01-1990",
            "15/01/1990",
            "1990/01/15",
            "15.01.1990",
            "1990.01.15",
        ] {
            let r = validate_date_on(input, today());
            assert!(r.is_valid, "{input}: {:?}", r.errors);
            assert_eq!(r.sanitized_str("date"), Some("1990-01-15"), "{input}");
        }
    }

    #[test]
    fn test_future_date_warns() {
        let r = validate_date_on("2030-01-01", today());
        assert!(r.is_valid);
        assert_eq!(r.warnings, vec!["Date appears to be in the future"]);
    }

    #[test]
    fn test_today_is_not_future() {
        let r = validate_date_on("2024-06-01", today());
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn test_rejects_garbage() {
        let r = validate_date_on("January 5th", today());
        assert!(!r.is_valid);
        assert!(r.errors[0].starts_with("Invalid date format"));
    }

    #[test]
    fn test_rejects_impossible_day() {
        assert!(!validate_date_on("2023-02-30", today()).is_valid);
    }

    #[test]
    fn test_empty_is_required_error() {
        let r = validate_date_on("   ", today());
        assert_eq!(r.errors, vec!["Date is required"]);
    }

    #[test]
    fn test_range_order() {
        let ok = validate_date_range("2020-01-01", "01/02/2020");
        assert!(ok.is_valid);
        assert_eq!(ok.sanitized_str("end_date"), Some("2020-02-01"));

        let bad = validate_date_range("2020-03-01", "2020-01-01");
        assert!(!bad.is_valid);
        assert_eq!(bad.errors, vec!["Start date must be before end date"]);
    }

    #[test]
    fn test_range_prefixes_endpoint_errors() {
        let r = validate_date_range("nope", "2020-01-01");
        assert!(r.errors[0].starts_with("Start date: Invalid date format"));
    }
}
