use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_timestamp, timestamp_at, SqliteStore};
use crate::workflows::awards::{ActorId, AuditEntry, AuditLogRepository, NewAuditEntry, SubmissionId};
use crate::workflows::RepositoryError;

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    Ok(AuditEntry {
        id: row.get(0)?,
        submission_id: SubmissionId(row.get(1)?),
        field_name: row.get(2)?,
        old_value: row.get(3)?,
        new_value: row.get(4)?,
        changed_by: ActorId(row.get(5)?),
        created_at: timestamp_at(row, 6)?,
    })
}

/// Append one entry through `conn`, which is usually the transaction carrying the change.
pub(super) fn insert_entry(
    conn: &Connection,
    entry: &NewAuditEntry,
) -> Result<AuditEntry, RepositoryError> {
    conn.execute(
        "INSERT INTO award_audit_log (form_id, field_name, old_value, new_value, changed_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.submission_id.0,
            entry.field_name,
            entry.old_value,
            entry.new_value,
            entry.changed_by.as_str(),
            format_timestamp(entry.recorded_at),
        ],
    )?;
    let id = conn.last_insert_rowid();
    let stored = conn.query_row(
        "SELECT id, form_id, field_name, old_value, new_value, changed_by, created_at
         FROM award_audit_log WHERE id = ?1",
        params![id],
        entry_from_row,
    )?;
    Ok(stored)
}

impl AuditLogRepository for SqliteStore {
    fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, RepositoryError> {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            let exists = tx
                .query_row(
                    "SELECT 1 FROM award_forms WHERE id = ?1",
                    params![entry.submission_id.0],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            if exists.is_none() {
                return Err(RepositoryError::NotFound);
            }
            let stored = insert_entry(&tx, &entry)?;
            tx.commit()?;
            Ok(stored)
        })
    }

    fn trail(&self, id: SubmissionId) -> Result<Vec<AuditEntry>, RepositoryError> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, form_id, field_name, old_value, new_value, changed_by, created_at
                 FROM award_audit_log WHERE form_id = ?1
                 ORDER BY created_at DESC, id DESC",
            )?;
            let entries = stmt
                .query_map(params![id.0], entry_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }
}
