//! Ordered alias lists for fields that arrive under more than one spelling.
//!
//! Form exports and hand-written payloads disagree on key casing
//! ("Platform" vs "platform"). Each logical field carries an ordered list of
//! accepted keys and the first non-empty value wins.

use serde_json::{Map, Value};

/// A logical field and the keys it may appear under, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAliases {
    /// Name used in error messages.
    pub label: &'static str,
    /// Accepted keys, highest priority first.
    pub keys: &'static [&'static str],
}

impl FieldAliases {
    pub const fn new(label: &'static str, keys: &'static [&'static str]) -> Self {
        Self { label, keys }
    }

    /// Resolve this field against a mapping.
    pub fn resolve<'a>(&self, map: &'a Map<String, Value>) -> Option<&'a str> {
        first_non_empty(map, self.keys)
    }
}

pub const PLATFORM: FieldAliases = FieldAliases::new("Platform", &["Platform", "platform"]);
pub const ADMIRALTY_CODE: FieldAliases =
    FieldAliases::new("Admiralty Code", &["Admiralty Code", "admiralty_code"]);
pub const IDENTITY: FieldAliases =
    FieldAliases::new("Username/IP", &["Username/IP", "identity", "username"]);
pub const TIMELINE_DATE: FieldAliases = FieldAliases::new("Date", &["Date", "date"]);
pub const TIMELINE_TIME: FieldAliases = FieldAliases::new("Time", &["Time", "time"]);
pub const EVENT_DESCRIPTION: FieldAliases =
    FieldAliases::new("Event Description", &["Event Description", "event"]);
pub const META_DATE: FieldAliases = FieldAliases::new("date", &["date", "date_created"]);
pub const SUMMARY: FieldAliases =
    FieldAliases::new("summary", &["summary", "intelligence_summary"]);

/// Return the first key in `keys` whose value is a non-empty string.
///
/// Whitespace-only strings count as empty. Non-string values are skipped.
pub fn first_non_empty<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| match map.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
        _ => None,
    })
}
