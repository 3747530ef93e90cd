//! Fuzz target for document loading and validation.

#![no_main]

use dossier_common::Document;
use dossier_validate::DocumentValidator;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // Malformed input is an error, never a panic
    if let Ok(doc) = Document::from_json_str(text) {
        let result = DocumentValidator::default().validate(&doc);
        assert_eq!(result.is_valid, result.errors.is_empty());
    }
});
