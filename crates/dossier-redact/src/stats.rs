//! Document-wide redaction accounting.

use crate::marker::count_spans;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Path name used for the document root.
pub const ROOT_PATH: &str = "data";

/// Redaction totals for a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionStats {
    /// Total spans across every string leaf.
    pub total_redactions: usize,
    /// Paths with at least one span, in walk order, each listed once.
    pub fields_with_redactions: Vec<String>,
    /// Span count per contributing path.
    pub redaction_breakdown: BTreeMap<String, usize>,
}

impl RedactionStats {
    /// Walk `value` recursively and count spans in every string leaf.
    ///
    /// Mapping children are addressed as `parent.key`, sequence elements as
    /// `parent[i]`. Numbers, booleans and nulls contribute nothing.
    pub fn collect(value: &Value) -> Self {
        let mut stats = Self::default();
        stats.walk(value, ROOT_PATH.to_string());
        stats
    }

    fn walk(&mut self, value: &Value, path: String) {
        match value {
            Value::String(s) => {
                let n = count_spans(s);
                if n > 0 {
                    self.total_redactions += n;
                    self.fields_with_redactions.push(path.clone());
                    self.redaction_breakdown.insert(path, n);
                }
            }
            Value::Object(map) => {
                for (key, child) in map {
                    self.walk(child, format!("{path}.{key}"));
                }
            }
            Value::Array(items) => {
                for (idx, child) in items.iter().enumerate() {
                    self.walk(child, format!("{path}[{idx}]"));
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }

    pub fn has_redactions(&self) -> bool {
        self.total_redactions > 0
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_paths() {
        let doc = json!({
            "target": {"name": "||Jane||", "age": 41},
            "timeline": [
                {"event": "plain"},
                {"event": "met ||A|| and ||B||"}
            ],
            "flag": true
        });
        let stats = RedactionStats::collect(&doc);
        assert_eq!(stats.total_redactions, 3);
        assert_eq!(
            stats.fields_with_redactions,
            vec!["data.target.name", "data.timeline[1].event"]
        );
        assert_eq!(stats.redaction_breakdown["data.timeline[1].event"], 2);
    }

    #[test]
    fn test_no_redactions() {
        let stats = RedactionStats::collect(&json!({"a": "b", "c": [1, 2]}));
        assert!(!stats.has_redactions());
        assert!(stats.fields_with_redactions.is_empty());
    }

    #[test]
    fn test_root_string() {
        let stats = RedactionStats::collect(&json!("||x||"));
        assert_eq!(stats.fields_with_redactions, vec!["data"]);
    }
}
