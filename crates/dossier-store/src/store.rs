//! SQLite-backed report store.
//!
//! One connection per store handle, guarded by a mutex. Every mutation runs
//! in its own `IMMEDIATE` transaction that commits on success and rolls back
//! on drop. Audit events are written after the mutation commits and never
//! fail the caller.

use crate::error::{Result, StoreError};
use crate::model::{
    AuditEvent, DeleteOutcome, InsertOutcome, NewAuditEvent, NewReport, ReportFilter,
    ReportRecord, ReportUpdate, ReportVersion, StoreStatistics,
};
use chrono::{DateTime, Utc};
use dossier_config::{DatabaseConfig, RetentionConfig};
use dossier_redact::RedactionStats;
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

const SCHEMA: &str = include_str!("schema.sql");

/// Sortable UTC timestamp text.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Default row cap for [`ReportStore::search`].
pub const SEARCH_LIMIT: usize = 50;

const RECORD_COLUMNS: &str = "report_id, title, classification, tlp, author, organization, \
     target_name, target_alias, status, summary, payload, redaction_count, file_path, \
     file_hash, page_count, version, is_encrypted, custom_metadata, created_at, updated_at, \
     accessed_at, archived, archived_at";

/// Versioned report metadata plus audit trail.
pub struct ReportStore {
    conn: Mutex<Connection>,
    retention: RetentionConfig,
    audit: bool,
}

impl ReportStore {
    /// Open (creating if needed) the database file named by `config`.
    pub fn open(config: &DatabaseConfig, retention: RetentionConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let conn = Connection::open(&config.path)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(path = %config.path.display(), journal_mode = %mode, "opened report store");
        Self::init(conn, retention)
    }

    /// A private in-memory database.
    pub fn open_in_memory(retention: RetentionConfig) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, retention)
    }

    fn init(conn: Connection, retention: RetentionConfig) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            retention,
            audit: true,
        })
    }

    /// Turn audit writes on or off. [`record_audit`](Self::record_audit)
    /// always writes.
    pub fn with_audit_logging(mut self, enabled: bool) -> Self {
        self.audit = enabled;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn in_transaction<T>(&self, operation: impl FnOnce(&Transaction) -> Result<T>) -> Result<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = operation(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Insert a report and its first version row.
    ///
    /// Idempotent on `report_id`: when the id is already taken the stored
    /// record is returned untouched as [`InsertOutcome::Existing`].
    pub fn insert(&self, new: NewReport) -> Result<InsertOutcome> {
        let now = timestamp(Utc::now());
        let redaction_count = payload_redactions(&new.payload);
        let payload = serde_json::to_string(&new.payload)?;
        let custom_metadata = serde_json::to_string(&new.custom_metadata)?;

        let outcome = self.in_transaction(|tx| {
            let version = next_version(tx, &new.report_id)?;
            let inserted = tx.execute(
                "INSERT INTO reports (report_id, title, classification, tlp, author, organization,
                     target_name, target_alias, status, summary, payload, redaction_count,
                     file_path, file_hash, page_count, version, is_encrypted, custom_metadata,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                     ?17, ?18, ?19, ?19)
                 ON CONFLICT(report_id) DO NOTHING",
                params![
                    new.report_id,
                    new.title,
                    new.classification,
                    new.tlp,
                    new.author,
                    new.organization,
                    new.target_name,
                    new.target_alias,
                    new.status,
                    new.summary,
                    payload,
                    redaction_count as i64,
                    new.file_path,
                    new.file_hash,
                    new.page_count,
                    version,
                    new.is_encrypted,
                    custom_metadata,
                    now,
                ],
            )?;
            if inserted == 1 {
                tx.execute(
                    "INSERT INTO report_versions
                         (report_id, version, payload, change_summary, modified_by, created_at)
                     VALUES (?1, ?2, ?3, 'Initial version', ?4, ?5)",
                    params![new.report_id, version, payload, new.author, now],
                )?;
            }
            let record = fetch_record(tx, &new.report_id)?
                .ok_or_else(|| StoreError::NotFound(new.report_id.clone()))?;
            Ok(if inserted == 1 {
                InsertOutcome::Created(record)
            } else {
                InsertOutcome::Existing(record)
            })
        })?;

        match &outcome {
            InsertOutcome::Created(record) => {
                info!(
                    report_id = %record.report_id,
                    redaction_count = record.redaction_count,
                    "report created"
                );
                self.log_audit(
                    NewAuditEvent::new("CREATE", "REPORT_CREATED", &record.author)
                        .for_report(&record.report_id)
                        .with_details(json!({
                            "title": record.title,
                            "classification": record.classification,
                            "version": record.version,
                        })),
                );
            }
            InsertOutcome::Existing(record) => {
                info!(report_id = %record.report_id, "report id exists; returning stored record");
            }
        }
        Ok(outcome)
    }

    /// Fetch a report and bump its `accessed_at`.
    pub fn get(&self, report_id: &str) -> Result<Option<ReportRecord>> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE reports SET accessed_at = ?2 WHERE report_id = ?1",
            params![report_id, timestamp(Utc::now())],
        )?;
        fetch_record(&conn, report_id)
    }

    /// Path of the artifact a stored record points at, without touching
    /// `accessed_at`. `None` when the id is unknown or has no file.
    pub fn recorded_file(&self, report_id: &str) -> Result<Option<PathBuf>> {
        let conn = self.lock()?;
        let path: Option<Option<String>> = conn
            .query_row(
                "SELECT file_path FROM reports WHERE report_id = ?1",
                params![report_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(path.flatten().map(PathBuf::from))
    }

    /// Filtered listing, most recent first.
    pub fn list(&self, filter: &ReportFilter) -> Result<Vec<ReportRecord>> {
        let mut clauses = vec!["archived = ?1".to_string()];
        let mut args = vec![SqlValue::Integer(i64::from(filter.archived))];
        let mut push = |clause: &str, value: &str| {
            args.push(SqlValue::Text(value.to_string()));
            clauses.push(clause.replace('?', &format!("?{}", args.len())));
        };
        if let Some(classification) = &filter.classification {
            push("classification = ?", classification);
        }
        if let Some(author) = &filter.author {
            push("author = ?", author);
        }
        if let Some(target) = &filter.target_name {
            push("instr(lower(coalesce(target_name, '')), lower(?)) > 0", target);
        }
        args.push(SqlValue::Integer(filter.limit as i64));
        args.push(SqlValue::Integer(filter.offset as i64));
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM reports WHERE {} \
             ORDER BY created_at DESC, id DESC LIMIT ?{} OFFSET ?{}",
            clauses.join(" AND "),
            args.len() - 1,
            args.len(),
        );

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), read_record)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Case-insensitive substring search over title, summary and target
    /// name, most recent first. A blank query matches nothing.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<ReportRecord>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM reports
             WHERE instr(lower(title), lower(?1)) > 0
                OR instr(lower(coalesce(summary, '')), lower(?1)) > 0
                OR instr(lower(coalesce(target_name, '')), lower(?1)) > 0
             ORDER BY created_at DESC, id DESC LIMIT ?2"
        );
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![query, limit as i64], read_record)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Apply allow-listed changes. Never touches `version`.
    pub fn update(&self, report_id: &str, update: &ReportUpdate, user: &str) -> Result<ReportRecord> {
        if update.is_empty() {
            return self
                .get(report_id)?
                .ok_or_else(|| StoreError::NotFound(report_id.to_string()));
        }
        let record = self.in_transaction(|tx| {
            let mut record = fetch_record(tx, report_id)?
                .ok_or_else(|| StoreError::NotFound(report_id.to_string()))?;
            apply_update(&mut record, update);
            record.updated_at = Utc::now();
            tx.execute(
                "UPDATE reports SET title = ?2, summary = ?3, status = ?4, page_count = ?5,
                     is_encrypted = ?6, custom_metadata = ?7, author = ?8, organization = ?9,
                     target_name = ?10, target_alias = ?11, file_path = ?12, file_hash = ?13,
                     payload = ?14, redaction_count = ?15, updated_at = ?16
                 WHERE report_id = ?1",
                params![
                    report_id,
                    record.title,
                    record.summary,
                    record.status,
                    record.page_count,
                    record.is_encrypted,
                    serde_json::to_string(&record.custom_metadata)?,
                    record.author,
                    record.organization,
                    record.target_name,
                    record.target_alias,
                    record.file_path,
                    record.file_hash,
                    serde_json::to_string(&record.payload)?,
                    record.redaction_count as i64,
                    timestamp(record.updated_at),
                ],
            )?;
            Ok(record)
        })?;

        self.log_audit(
            NewAuditEvent::new("UPDATE", "REPORT_UPDATED", user)
                .for_report(report_id)
                .with_details(json!({ "fields": update_fields(update) })),
        );
        Ok(record)
    }

    /// Append an immutable snapshot of the current payload and move the
    /// record to the new version number.
    pub fn snapshot(
        &self,
        report_id: &str,
        change_summary: Option<&str>,
        modified_by: &str,
    ) -> Result<ReportVersion> {
        let version = self.in_transaction(|tx| {
            let record = fetch_record(tx, report_id)?
                .ok_or_else(|| StoreError::NotFound(report_id.to_string()))?;
            let number = next_version(tx, report_id)?.max(record.version + 1);
            let now = Utc::now();
            tx.execute(
                "INSERT INTO report_versions
                     (report_id, version, payload, change_summary, modified_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    report_id,
                    number,
                    serde_json::to_string(&record.payload)?,
                    change_summary,
                    modified_by,
                    timestamp(now),
                ],
            )?;
            tx.execute(
                "UPDATE reports SET version = ?2, updated_at = ?3 WHERE report_id = ?1",
                params![report_id, number, timestamp(now)],
            )?;
            Ok(ReportVersion {
                report_id: report_id.to_string(),
                version: number,
                payload: record.payload,
                change_summary: change_summary.map(str::to_string),
                modified_by: modified_by.to_string(),
                created_at: now,
            })
        })?;

        info!(report_id, version = version.version, "report version created");
        self.log_audit(
            NewAuditEvent::new("VERSION", "SNAPSHOT_CREATED", modified_by)
                .for_report(report_id)
                .with_details(json!({
                    "version": version.version,
                    "change_summary": version.change_summary,
                })),
        );
        Ok(version)
    }

    /// Version history, oldest first.
    pub fn versions(&self, report_id: &str) -> Result<Vec<ReportVersion>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT report_id, version, payload, change_summary, modified_by, created_at
             FROM report_versions WHERE report_id = ?1 ORDER BY version ASC",
        )?;
        let rows = stmt.query_map(params![report_id], |row| {
            Ok(ReportVersion {
                report_id: row.get(0)?,
                version: row.get(1)?,
                payload: json_column(row, 2)?,
                change_summary: row.get(3)?,
                modified_by: row.get(4)?,
                created_at: time_column(row, 5)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Mark a report archived. Archived reports drop out of default listings.
    pub fn archive(&self, report_id: &str, user: &str) -> Result<ReportRecord> {
        let record = self.in_transaction(|tx| {
            let now = timestamp(Utc::now());
            let changed = tx.execute(
                "UPDATE reports SET archived = 1, archived_at = ?2, updated_at = ?2
                 WHERE report_id = ?1",
                params![report_id, now],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(report_id.to_string()));
            }
            fetch_record(tx, report_id)?.ok_or_else(|| StoreError::NotFound(report_id.to_string()))
        })?;

        self.log_audit(NewAuditEvent::new("ARCHIVE", "REPORT_ARCHIVED", user).for_report(report_id));
        Ok(record)
    }

    /// Remove the current-state row. Versions and audit events survive
    /// unless the retention settings cascade them.
    pub fn delete(&self, report_id: &str, user: &str) -> Result<DeleteOutcome> {
        let retention = self.retention.clone();
        let outcome = self.in_transaction(|tx| {
            let removed = tx.execute("DELETE FROM reports WHERE report_id = ?1", params![report_id])?;
            if removed == 0 {
                return Err(StoreError::NotFound(report_id.to_string()));
            }
            let mut outcome = DeleteOutcome::default();
            if retention.cascade_versions {
                outcome.versions_removed = tx.execute(
                    "DELETE FROM report_versions WHERE report_id = ?1",
                    params![report_id],
                )?;
            }
            if retention.cascade_audit {
                outcome.audit_events_removed = tx.execute(
                    "DELETE FROM audit_logs WHERE report_id = ?1",
                    params![report_id],
                )?;
            }
            Ok(outcome)
        })?;

        info!(
            report_id,
            versions_removed = outcome.versions_removed,
            audit_events_removed = outcome.audit_events_removed,
            "report deleted"
        );
        self.log_audit(
            NewAuditEvent::new("DELETE", "REPORT_DELETED", user)
                .for_report(report_id)
                .with_details(serde_json::to_value(outcome)?),
        );
        Ok(outcome)
    }

    pub fn statistics(&self) -> Result<StoreStatistics> {
        let conn = self.lock()?;
        let (total, archived, encrypted): (i64, i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(archived), 0), COALESCE(SUM(is_encrypted), 0)
             FROM reports",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        let mut stmt = conn.prepare(
            "SELECT classification, COUNT(*) FROM reports GROUP BY classification",
        )?;
        let by_classification: BTreeMap<String, u64> = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<rusqlite::Result<_>>()?;
        Ok(StoreStatistics {
            total_reports: total as u64,
            archived_reports: archived as u64,
            active_reports: (total - archived) as u64,
            encrypted_reports: encrypted as u64,
            by_classification,
        })
    }

    /// Audit events, newest first, optionally scoped to one report.
    pub fn audit_events(&self, report_id: Option<&str>, limit: usize) -> Result<Vec<AuditEvent>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, event_type, action, user, report_id, details, created_at
             FROM audit_logs WHERE ?1 IS NULL OR report_id = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![report_id, limit as i64], |row| {
            Ok(AuditEvent {
                id: row.get(0)?,
                event_type: row.get(1)?,
                action: row.get(2)?,
                user: row.get(3)?,
                report_id: row.get(4)?,
                details: optional_json(row, 5)?.unwrap_or(Value::Null),
                created_at: time_column(row, 6)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Append an audit event and return its row id.
    pub fn record_audit(&self, event: &NewAuditEvent) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO audit_logs (report_id, event_type, action, user, details, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.report_id,
                event.event_type,
                event.action,
                event.user,
                serde_json::to_string(&event.details)?,
                timestamp(Utc::now()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Like [`record_audit`](Self::record_audit) but failures are only logged.
    pub fn log_audit(&self, event: NewAuditEvent) {
        if !self.audit {
            return;
        }
        if let Err(e) = self.record_audit(&event) {
            warn!(
                event_type = %event.event_type,
                action = %event.action,
                error = %e,
                "failed to write audit event"
            );
        }
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn payload_redactions(payload: &Map<String, Value>) -> usize {
    RedactionStats::collect(&Value::Object(payload.clone())).total_redactions
}

fn next_version(conn: &Connection, report_id: &str) -> Result<u32> {
    let max: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM report_versions WHERE report_id = ?1",
        params![report_id],
        |row| row.get(0),
    )?;
    Ok(max + 1)
}

fn fetch_record(conn: &Connection, report_id: &str) -> Result<Option<ReportRecord>> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM reports WHERE report_id = ?1");
    Ok(conn
        .query_row(&sql, params![report_id], read_record)
        .optional()?)
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<ReportRecord> {
    Ok(ReportRecord {
        report_id: row.get(0)?,
        title: row.get(1)?,
        classification: row.get(2)?,
        tlp: row.get(3)?,
        author: row.get(4)?,
        organization: row.get(5)?,
        target_name: row.get(6)?,
        target_alias: row.get(7)?,
        status: row.get(8)?,
        summary: row.get(9)?,
        payload: json_column(row, 10)?,
        redaction_count: row.get::<_, i64>(11)?.max(0) as usize,
        file_path: row.get(12)?,
        file_hash: row.get(13)?,
        page_count: row.get(14)?,
        version: row.get(15)?,
        is_encrypted: row.get(16)?,
        custom_metadata: optional_json(row, 17)?.unwrap_or_default(),
        created_at: time_column(row, 18)?,
        updated_at: time_column(row, 19)?,
        accessed_at: optional_time(row, 20)?,
        archived: row.get(21)?,
        archived_at: optional_time(row, 22)?,
    })
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(idx, e))
}

fn optional_json<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
    row.get::<_, Option<String>>(idx)?
        .map(|text| serde_json::from_str(&text).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn parse_time(idx: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    parse_time(idx, &text)
}

fn optional_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|text| parse_time(idx, &text))
        .transpose()
}

fn merge(target: &mut Map<String, Value>, changes: &Map<String, Value>) {
    for (key, value) in changes {
        target.insert(key.clone(), value.clone());
    }
}

fn apply_update(record: &mut ReportRecord, update: &ReportUpdate) {
    fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
        if let Some(v) = value {
            *slot = v.clone();
        }
    }
    fn set_opt<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
        if value.is_some() {
            *slot = value.clone();
        }
    }

    set(&mut record.title, &update.title);
    set_opt(&mut record.summary, &update.summary);
    set_opt(&mut record.status, &update.status);
    set(&mut record.page_count, &update.page_count);
    set(&mut record.is_encrypted, &update.is_encrypted);
    set(&mut record.author, &update.author);
    set(&mut record.organization, &update.organization);
    set_opt(&mut record.target_name, &update.target_name);
    set_opt(&mut record.target_alias, &update.target_alias);
    set_opt(&mut record.file_path, &update.file_path);
    set_opt(&mut record.file_hash, &update.file_hash);
    if let Some(meta) = &update.custom_metadata {
        merge(&mut record.custom_metadata, meta);
    }
    if let Some(payload) = &update.payload {
        merge(&mut record.payload, payload);
        record.redaction_count = payload_redactions(&record.payload);
    }
}

fn update_fields(update: &ReportUpdate) -> Vec<&'static str> {
    [
        ("title", update.title.is_some()),
        ("summary", update.summary.is_some()),
        ("status", update.status.is_some()),
        ("page_count", update.page_count.is_some()),
        ("is_encrypted", update.is_encrypted.is_some()),
        ("custom_metadata", update.custom_metadata.is_some()),
        ("author", update.author.is_some()),
        ("organization", update.organization.is_some()),
        ("target_name", update.target_name.is_some()),
        ("target_alias", update.target_alias.is_some()),
        ("file_path", update.file_path.is_some()),
        ("file_hash", update.file_hash.is_some()),
        ("payload", update.payload.is_some()),
    ]
    .into_iter()
    .filter_map(|(name, set)| set.then_some(name))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dossier_common::Document;

    fn store() -> ReportStore {
        ReportStore::open_in_memory(RetentionConfig::default()).unwrap()
    }

    fn report(id: &str, summary: &str) -> NewReport {
        let doc = Document::from_value(json!({
            "meta": {"classification": "SECRET", "author": "Analyst"},
            "target": {"name": "Jane Doe"},
            "summary": summary,
        }))
        .unwrap();
        NewReport::from_document(id, &doc)
    }

    #[test]
    fn test_insert_derives_count_and_version() {
        let store = store();
        let outcome = store.insert(report("R-1", "Seen in ||Berlin|| and ||Oslo||")).unwrap();
        assert!(outcome.is_created());
        let record = outcome.record();
        assert_eq!(record.redaction_count, 2);
        assert_eq!(record.version, 1);

        let versions = store.versions("R-1").unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].change_summary.as_deref(), Some("Initial version"));
        assert_eq!(versions[0].modified_by, "Analyst");
    }

    #[test]
    fn test_recorded_file_does_not_touch_access_time() {
        let store = store();
        assert_eq!(store.recorded_file("R-1").unwrap(), None);
        let mut new = report("R-1", "plain");
        new.file_path = Some("/reports/R-1.pdf".to_string());
        let inserted = store.insert(new).unwrap().into_record();

        assert_eq!(
            store.recorded_file("R-1").unwrap(),
            Some(PathBuf::from("/reports/R-1.pdf"))
        );
        let listed = store.list(&ReportFilter::default()).unwrap();
        assert_eq!(listed[0].accessed_at, inserted.accessed_at);
    }

    #[test]
    fn test_insert_collision_returns_existing() {
        let store = store();
        store.insert(report("R-1", "first")).unwrap();
        let second = store.insert(report("R-1", "second ||x||")).unwrap();
        assert!(!second.is_created());
        assert_eq!(second.record().summary.as_deref(), Some("first"));
        assert_eq!(second.record().redaction_count, 0);
        assert_eq!(store.versions("R-1").unwrap().len(), 1);
    }

    #[test]
    fn test_update_never_bumps_version() {
        let store = store();
        store.insert(report("R-1", "plain")).unwrap();
        let fields = json!({
            "title": "Renamed",
            "version": 7,
            "payload": {"summary": "now ||hidden||"},
            "custom_metadata": {"reviewed": true},
        });
        let (update, ignored) = ReportUpdate::from_map(fields.as_object().unwrap());
        assert_eq!(ignored, vec!["version"]);

        let record = store.update("R-1", &update, "Editor").unwrap();
        assert_eq!(record.title, "Renamed");
        assert_eq!(record.version, 1);
        assert_eq!(record.redaction_count, 1);
        assert!(record.payload.contains_key("meta"), "payload is merged, not replaced");
        assert_eq!(record.custom_metadata["reviewed"], json!(true));
        assert!(record.updated_at >= record.created_at);
    }

    #[test]
    fn test_snapshot_bumps_version() {
        let store = store();
        store.insert(report("R-1", "plain")).unwrap();
        let v2 = store.snapshot("R-1", Some("reviewed"), "Editor").unwrap();
        assert_eq!(v2.version, 2);
        let record = store.get("R-1").unwrap().unwrap();
        assert_eq!(record.version, 2);
        assert!(record.accessed_at.is_some());
        let numbers: Vec<u32> = store.versions("R-1").unwrap().iter().map(|v| v.version).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_missing_report_is_not_found() {
        let store = store();
        assert!(store.get("nope").unwrap().is_none());
        assert!(matches!(
            store.archive("nope", "x").unwrap_err(),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            store.snapshot("nope", None, "x").unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn test_every_mutation_is_audited() {
        let store = store();
        store.insert(report("R-1", "plain")).unwrap();
        let update = ReportUpdate {
            status: Some("Closed".to_string()),
            ..ReportUpdate::default()
        };
        store.update("R-1", &update, "Editor").unwrap();
        store.snapshot("R-1", None, "Editor").unwrap();
        store.archive("R-1", "Editor").unwrap();
        store.delete("R-1", "Editor").unwrap();

        let actions: Vec<String> = store
            .audit_events(Some("R-1"), 10)
            .unwrap()
            .into_iter()
            .rev()
            .map(|e| e.action)
            .collect();
        assert_eq!(
            actions,
            vec![
                "REPORT_CREATED",
                "REPORT_UPDATED",
                "SNAPSHOT_CREATED",
                "REPORT_ARCHIVED",
                "REPORT_DELETED"
            ]
        );
    }

    #[test]
    fn test_audit_logging_can_be_disabled() {
        let store = store().with_audit_logging(false);
        store.insert(report("R-1", "plain")).unwrap();
        store.archive("R-1", "Editor").unwrap();
        assert!(store.audit_events(None, 10).unwrap().is_empty());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let store = store();
        store.insert(report("R-1", "Met a courier in Vienna")).unwrap();
        store.insert(report("R-2", "Nothing here")).unwrap();
        let hits = store.search("VIENNA", SEARCH_LIMIT).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].report_id, "R-1");
        assert_eq!(store.search("jane", SEARCH_LIMIT).unwrap().len(), 2);
        assert!(store.search("  ", SEARCH_LIMIT).unwrap().is_empty());
    }
}
