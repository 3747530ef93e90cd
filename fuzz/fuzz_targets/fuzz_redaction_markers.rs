//! Fuzz target for `||...||` marker scanning.
//!
//! Spans must lie on char boundaries and never overlap, and counting must
//! agree with the scanner.

#![no_main]

use dossier_redact::{find_spans, RedactionEngine, RedactionPolicy};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let spans = find_spans(data);
    let mut last_end = 0;
    for span in &spans {
        assert!(span.outer.start >= last_end);
        let _ = span.content(data);
        last_end = span.outer.end;
    }

    let engine = RedactionEngine::new(RedactionPolicy::default());
    assert_eq!(engine.count(data), spans.len());
    let _ = engine.apply(data);
    let _ = engine.apply_html(data);
    let _ = engine.validate(data);
});
