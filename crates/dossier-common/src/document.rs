//! The intelligence document model.
//!
//! A document is a JSON-shaped mapping of sections. Mapping sections (meta,
//! target, biometrics, ...) hold string fields; list sections
//! (digital_footprint, timeline, incidents) hold mappings. The pipeline never
//! requires a fixed schema beyond what the validators check, so the payload is
//! kept as a `serde_json::Map` and round-trips untouched into storage.

use crate::alias::{self, FieldAliases};
use crate::error::{DocumentError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Mapping sections, in presentation order.
pub const MAPPING_SECTIONS: &[&str] = &[
    "meta",
    "target",
    "biometrics",
    "osint",
    "sigint",
    "humint",
    "financial",
    "connections",
    "recommendations",
    "images",
];

/// Sequence sections, in presentation order.
pub const LIST_SECTIONS: &[&str] = &["digital_footprint", "timeline", "incidents"];

/// All known section names.
pub fn section_names() -> impl Iterator<Item = &'static str> {
    MAPPING_SECTIONS.iter().chain(LIST_SECTIONS.iter()).copied()
}

/// A structured intelligence record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing JSON value; the root must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(DocumentError::NotAMapping(kind_name(&other))),
        }
    }

    /// Decode a document from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Decode a document from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text)?;
        Self::from_value(value)
    }

    /// Load a document from disk. `.yaml`/`.yml` files are parsed as YAML,
    /// everything else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            _ => Self::from_json_str(&text),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// A mapping-shaped section, if present and actually a mapping.
    pub fn section(&self, name: &str) -> Option<&Map<String, Value>> {
        self.0.get(name).and_then(Value::as_object)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Map<String, Value>> {
        self.0.get_mut(name).and_then(Value::as_object_mut)
    }

    /// A sequence-shaped section, if present and actually a sequence.
    pub fn list(&self, name: &str) -> Option<&Vec<Value>> {
        self.0.get(name).and_then(Value::as_array)
    }

    /// A string field inside a mapping section.
    pub fn field(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)
            .and_then(|s| s.get(key))
            .and_then(Value::as_str)
    }

    /// A field resolved through an alias list inside a mapping section.
    pub fn field_alias(&self, section: &str, aliases: &FieldAliases) -> Option<&str> {
        self.section(section).and_then(|s| aliases.resolve(s))
    }

    /// The free-text summary, accepted at the root under `summary` or
    /// `intelligence_summary`.
    pub fn summary(&self) -> Option<&str> {
        alias::SUMMARY.resolve(&self.0)
    }

    pub fn report_id(&self) -> Option<&str> {
        self.field("meta", "report_id").filter(|s| !s.trim().is_empty())
    }

    pub fn classification(&self) -> Option<&str> {
        self.field("meta", "classification")
            .filter(|s| !s.trim().is_empty())
    }

    pub fn author(&self) -> Option<&str> {
        self.field("meta", "author").filter(|s| !s.trim().is_empty())
    }

    pub fn target_name(&self) -> Option<&str> {
        self.field("target", "name").filter(|s| !s.trim().is_empty())
    }

    /// SHA-256 over the canonical JSON encoding of the payload.
    pub fn content_hash(&self) -> String {
        let bytes = serde_json::to_vec(&self.0).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
