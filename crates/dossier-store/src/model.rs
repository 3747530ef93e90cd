//! Row types for reports, versions and audit events.

use chrono::{DateTime, Utc};
use dossier_common::Document;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Longest summary kept on the record.
pub const SUMMARY_MAX_CHARS: usize = 500;

/// The single mutable current view of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub report_id: String,
    pub title: String,
    pub classification: String,
    pub tlp: String,
    pub author: String,
    pub organization: String,
    pub target_name: Option<String>,
    pub target_alias: Option<String>,
    pub status: Option<String>,
    pub summary: Option<String>,
    pub payload: Map<String, Value>,
    /// Always derived from `payload`.
    pub redaction_count: usize,
    pub file_path: Option<String>,
    pub file_hash: Option<String>,
    pub page_count: u32,
    pub version: u32,
    pub is_encrypted: bool,
    pub custom_metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub accessed_at: Option<DateTime<Utc>>,
    pub archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
}

/// Fields for a new report. There is deliberately no `redaction_count` or
/// `version`: the store derives both.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub report_id: String,
    pub title: String,
    pub classification: String,
    pub tlp: String,
    pub author: String,
    pub organization: String,
    pub target_name: Option<String>,
    pub target_alias: Option<String>,
    pub status: Option<String>,
    pub summary: Option<String>,
    pub payload: Map<String, Value>,
    pub file_path: Option<String>,
    pub file_hash: Option<String>,
    pub page_count: u32,
    pub is_encrypted: bool,
    pub custom_metadata: Map<String, Value>,
}

impl NewReport {
    /// Pull record columns out of a document payload.
    pub fn from_document(report_id: impl Into<String>, doc: &Document) -> Self {
        let meta = |key: &str| {
            doc.field("meta", key)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        };
        let target = |key: &str| {
            doc.field("target", key)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        };
        let target_name = target("name");
        let title = meta("title").unwrap_or_else(|| {
            format!("Dossier: {}", target_name.as_deref().unwrap_or("UNKNOWN"))
        });

        Self {
            report_id: report_id.into(),
            title,
            classification: meta("classification").unwrap_or_else(|| "UNCLASSIFIED".to_string()),
            tlp: meta("tlp").unwrap_or_else(|| "WHITE".to_string()),
            author: meta("author").unwrap_or_else(|| "UNKNOWN".to_string()),
            organization: meta("organization")
                .or_else(|| meta("org_name"))
                .unwrap_or_else(|| "AGENCY".to_string()),
            target_name,
            target_alias: target("alias"),
            status: target("status"),
            summary: doc
                .summary()
                .map(|s| s.chars().take(SUMMARY_MAX_CHARS).collect()),
            payload: doc.as_map().clone(),
            file_path: None,
            file_hash: None,
            page_count: 1,
            is_encrypted: false,
            custom_metadata: Map::new(),
        }
    }
}

/// Allow-listed changes to an existing report.
///
/// `version` and `redaction_count` cannot be set: the first only moves on
/// snapshot, the second is recomputed when `payload` changes. Map-valued
/// fields are shallow-merged into the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportUpdate {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub status: Option<String>,
    pub page_count: Option<u32>,
    pub is_encrypted: Option<bool>,
    pub custom_metadata: Option<Map<String, Value>>,
    pub author: Option<String>,
    pub organization: Option<String>,
    pub target_name: Option<String>,
    pub target_alias: Option<String>,
    pub file_path: Option<String>,
    pub file_hash: Option<String>,
    pub payload: Option<Map<String, Value>>,
}

impl ReportUpdate {
    /// Build an update from loose key/value pairs.
    ///
    /// Returns the update plus the keys that were dropped, either because
    /// they are not allow-listed or because the value had the wrong shape.
    pub fn from_map(fields: &Map<String, Value>) -> (Self, Vec<String>) {
        let mut update = Self::default();
        let mut ignored = Vec::new();
        for (key, value) in fields {
            let text = || value.as_str().map(str::to_string);
            let object = || value.as_object().cloned();
            let accepted = match key.as_str() {
                "title" => text().map(|v| update.title = Some(v)),
                "summary" => text().map(|v| update.summary = Some(v)),
                "status" => text().map(|v| update.status = Some(v)),
                "author" => text().map(|v| update.author = Some(v)),
                "organization" => text().map(|v| update.organization = Some(v)),
                "target_name" => text().map(|v| update.target_name = Some(v)),
                "target_alias" => text().map(|v| update.target_alias = Some(v)),
                "file_path" => text().map(|v| update.file_path = Some(v)),
                "file_hash" => text().map(|v| update.file_hash = Some(v)),
                "page_count" => value
                    .as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .map(|v| update.page_count = Some(v)),
                "is_encrypted" => value.as_bool().map(|v| update.is_encrypted = Some(v)),
                "custom_metadata" => object().map(|v| update.custom_metadata = Some(v)),
                "payload" | "data" => object().map(|v| update.payload = Some(v)),
                _ => None,
            };
            if accepted.is_none() {
                ignored.push(key.clone());
            }
        }
        (update, ignored)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Result of an idempotent insert.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Created(ReportRecord),
    /// The id was taken; the stored record is returned unchanged.
    Existing(ReportRecord),
}

impl InsertOutcome {
    pub fn record(&self) -> &ReportRecord {
        match self {
            InsertOutcome::Created(r) | InsertOutcome::Existing(r) => r,
        }
    }

    pub fn into_record(self) -> ReportRecord {
        match self {
            InsertOutcome::Created(r) | InsertOutcome::Existing(r) => r,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, InsertOutcome::Created(_))
    }
}

/// An immutable payload snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportVersion {
    pub report_id: String,
    pub version: u32,
    pub payload: Map<String, Value>,
    pub change_summary: Option<String>,
    pub modified_by: String,
    pub created_at: DateTime<Utc>,
}

/// An immutable audit trail entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: i64,
    pub event_type: String,
    pub action: String,
    pub user: String,
    pub report_id: Option<String>,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

/// Audit event to append.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEvent {
    pub event_type: String,
    pub action: String,
    pub user: String,
    pub report_id: Option<String>,
    pub details: Value,
}

impl NewAuditEvent {
    pub fn new(event_type: &str, action: &str, user: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            action: action.to_string(),
            user: user.to_string(),
            report_id: None,
            details: Value::Object(Map::new()),
        }
    }

    pub fn for_report(mut self, report_id: &str) -> Self {
        self.report_id = Some(report_id.to_string());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

/// Listing filters. Defaults list active reports, 100 at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFilter {
    pub classification: Option<String>,
    pub author: Option<String>,
    /// Case-insensitive substring.
    pub target_name: Option<String>,
    pub archived: bool,
    pub limit: usize,
    pub offset: usize,
}

impl Default for ReportFilter {
    fn default() -> Self {
        Self {
            classification: None,
            author: None,
            target_name: None,
            archived: false,
            limit: 100,
            offset: 0,
        }
    }
}

/// What a deletion removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub versions_removed: usize,
    pub audit_events_removed: usize,
}

/// Store-wide counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStatistics {
    pub total_reports: u64,
    pub archived_reports: u64,
    pub active_reports: u64,
    pub encrypted_reports: u64,
    pub by_classification: BTreeMap<String, u64>,
}
