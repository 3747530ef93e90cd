//! Fuzz target for the rendered-markup block parser.
//!
//! Tests that `parse_markup` handles arbitrary input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let _ = dossier_pdf::parse_markup(data, "redacted");
});
