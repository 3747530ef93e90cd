//! Paired-delimiter scanner.
//!
//! Matching is leftmost and shortest: the first `||` opens a span, the next
//! `||` on the same line closes it. Span content never crosses a newline.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

/// The redaction delimiter.
pub const MARKER: &str = "||";

static SPAN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\|\|(.*?)\|\|").expect("static redaction pattern"));

/// One matched span within a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSpan {
    /// Byte range including both delimiters.
    pub outer: Range<usize>,
    /// Byte range of the content between the delimiters.
    pub inner: Range<usize>,
}

impl MarkerSpan {
    /// The span content within `text`.
    pub fn content<'a>(&self, text: &'a str) -> &'a str {
        &text[self.inner.clone()]
    }

    /// Content length in characters (what the rendered tag reports).
    pub fn char_len(&self, text: &str) -> usize {
        self.content(text).chars().count()
    }
}

/// Locate every well-formed span in `text`, in order.
pub fn find_spans(text: &str) -> Vec<MarkerSpan> {
    SPAN_PATTERN
        .captures_iter(text)
        .filter_map(|caps| {
            let outer = caps.get(0)?;
            let inner = caps.get(1)?;
            Some(MarkerSpan {
                outer: outer.range(),
                inner: inner.range(),
            })
        })
        .collect()
}

/// Number of well-formed spans in `text`.
pub fn count_spans(text: &str) -> usize {
    SPAN_PATTERN.find_iter(text).count()
}

/// Replace each span using `f(content)`, copying the rest verbatim through `g`.
pub(crate) fn rewrite<F, G>(text: &str, mut span: F, mut plain: G) -> String
where
    F: FnMut(&str) -> String,
    G: FnMut(&str) -> String,
{
    let mut out = String::with_capacity(text.len() + 32);
    let mut cursor = 0;
    for s in find_spans(text) {
        out.push_str(&plain(&text[cursor..s.outer.start]));
        out.push_str(&span(s.content(text)));
        cursor = s.outer.end;
    }
    out.push_str(&plain(&text[cursor..]));
    out
}
