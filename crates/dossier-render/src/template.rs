//! Template set and askama bindings.

use crate::view::DossierView;
use askama::Template;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of report layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateName {
    /// Tabular case-file layout.
    Dossier,
    /// Single-column narrative layout.
    Scroll,
}

impl TemplateName {
    pub const ALL: [TemplateName; 2] = [TemplateName::Dossier, TemplateName::Scroll];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateName::Dossier => "dossier",
            TemplateName::Scroll => "scroll",
        }
    }
}

impl fmt::Display for TemplateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dossier" => Ok(TemplateName::Dossier),
            "scroll" => Ok(TemplateName::Scroll),
            other => Err(format!("unknown template '{other}'")),
        }
    }
}

/// Render-time filters available to every template.
pub mod filters {
    use dossier_redact::{RedactionEngine, RedactionPolicy};
    use std::fmt::Display;

    /// Escape the value and mark every `||span||` with the given CSS class.
    ///
    /// The result is already safe HTML; templates follow it with `|safe`.
    pub fn redact<T: Display>(value: T, css_class: &str) -> askama::Result<String> {
        let engine = RedactionEngine::new(RedactionPolicy {
            css_class: css_class.to_string(),
            ..RedactionPolicy::default()
        });
        Ok(engine.apply_html(&value.to_string()))
    }

    /// Blank out every `||span||` for contexts that cannot hold markup.
    ///
    /// Askama still escapes the result.
    pub fn masked<T: Display>(value: T) -> askama::Result<String> {
        Ok(RedactionEngine::default().mask(&value.to_string()))
    }
}

#[derive(Template)]
#[template(path = "dossier.html")]
pub(crate) struct DossierTemplate<'a> {
    pub view: &'a DossierView,
    pub css_class: &'a str,
    pub generated_at: &'a str,
}

#[derive(Template)]
#[template(path = "scroll.html")]
pub(crate) struct ScrollTemplate<'a> {
    pub view: &'a DossierView,
    pub css_class: &'a str,
    pub generated_at: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_name_parse() {
        assert_eq!("Dossier".parse::<TemplateName>(), Ok(TemplateName::Dossier));
        assert_eq!(" scroll ".parse::<TemplateName>(), Ok(TemplateName::Scroll));
        assert!("anubis".parse::<TemplateName>().is_err());
    }

    #[test]
    fn test_redact_filter_escapes_and_marks() {
        let out = filters::redact("<i>||a&b||</i>", "redacted").unwrap();
        assert_eq!(
            out,
            r#"&lt;i&gt;<span class="redacted" data-redaction-length="3">a&amp;b</span>&lt;/i&gt;"#
        );
    }

    #[test]
    fn test_masked_filter_leaves_no_markers() {
        let out = filters::masked("Op ||Nightfall||").unwrap();
        assert!(!out.contains("||"));
        assert!(!out.contains("Nightfall"));
        assert!(out.starts_with("Op "));
    }
}
