//! Input normalization shared by the field validators.

pub const MAX_NAME_LENGTH: usize = 200;
pub const MAX_SHORT_TEXT: usize = 500;
pub const MAX_TEXT_LENGTH: usize = 10_000;
pub const MIN_NAME_LENGTH: usize = 2;

/// Remove NUL bytes, trim, collapse internal whitespace runs to a single
/// space and cut to `max_chars` characters.
///
/// NUL bytes are dropped rather than treated as separators, so `"ab\0cd"`
/// becomes `"abcd"`.
pub fn sanitize_input(text: &str, max_chars: usize) -> String {
    text.replace('\0', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(max_chars)
        .collect()
}
