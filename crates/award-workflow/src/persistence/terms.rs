use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use super::{conversion_error, date_at, format_date, SqliteStore, UnknownLabel};
use crate::workflows::terms::{
    AcademicTerm, Semester, TermFlag, TermId, TermPlacement, TermRepository, TermWriteError,
};
use crate::workflows::RepositoryError;

const TERM_COLUMNS: &str =
    "id, year, semester, start_date, end_date, is_current, is_open_for_registration";

fn term_from_row(row: &Row<'_>) -> rusqlite::Result<AcademicTerm> {
    let semester: u8 = row.get(2)?;
    let semester = Semester::from_number(semester)
        .ok_or_else(|| conversion_error(2, UnknownLabel(semester.to_string())))?;
    Ok(AcademicTerm {
        id: TermId(row.get(0)?),
        year: row.get(1)?,
        semester,
        start_date: date_at(row, 3)?,
        end_date: date_at(row, 4)?,
        is_current: row.get(5)?,
        is_open_for_registration: row.get(6)?,
    })
}

fn fetch_term(conn: &Connection, id: TermId) -> Result<Option<AcademicTerm>, RepositoryError> {
    let sql = format!("SELECT {TERM_COLUMNS} FROM academic_terms WHERE id = ?1");
    let term = conn
        .query_row(&sql, params![id.0], term_from_row)
        .optional()?;
    Ok(term)
}

fn flagged(conn: &Connection, condition: &str) -> Result<Option<AcademicTerm>, RepositoryError> {
    let sql = format!("SELECT {TERM_COLUMNS} FROM academic_terms WHERE {condition} LIMIT 1");
    let term = conn.query_row(&sql, [], term_from_row).optional()?;
    Ok(term)
}

/// Submissions filed under a term's (year, semester).
fn references(conn: &Connection, term: &AcademicTerm) -> Result<i64, RepositoryError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM award_forms WHERE academic_year = ?1 AND semester = ?2",
        params![term.year, term.semester.number()],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn all_terms(conn: &Connection) -> Result<Vec<AcademicTerm>, RepositoryError> {
    let sql =
        format!("SELECT {TERM_COLUMNS} FROM academic_terms ORDER BY year DESC, semester DESC");
    let mut stmt = conn.prepare(&sql)?;
    let terms = stmt
        .query_map([], term_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(terms)
}

impl TermRepository for SqliteStore {
    fn insert(&self, place: &TermPlacement<'_>) -> Result<AcademicTerm, TermWriteError> {
        let placed = self.with_connection(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let term = match place(&all_terms(&tx)?) {
                Ok(term) => term,
                Err(violation) => return Ok(Err(violation)),
            };
            tx.execute(
                "INSERT INTO academic_terms (year, semester, start_date, end_date)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    term.year,
                    term.semester.number(),
                    format_date(term.start_date),
                    format_date(term.end_date),
                ],
            )?;
            let id = TermId(tx.last_insert_rowid());
            let stored = fetch_term(&tx, id)?.ok_or(RepositoryError::NotFound)?;
            tx.commit()?;
            Ok(Ok(stored))
        })?;
        Ok(placed?)
    }

    fn update(
        &self,
        id: TermId,
        place: &TermPlacement<'_>,
    ) -> Result<AcademicTerm, TermWriteError> {
        let placed = self.with_connection(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let before = fetch_term(&tx, id)?.ok_or(RepositoryError::NotFound)?;
            let term = match place(&all_terms(&tx)?) {
                Ok(term) => term,
                Err(violation) => return Ok(Err(violation)),
            };
            let moved = (term.year, term.semester) != (before.year, before.semester);
            if moved {
                let references = references(&tx, &before)?;
                if references > 0 {
                    return Err(RepositoryError::InUse(format!(
                        "term {} has {references} submission(s) and cannot move",
                        before.position()
                    )));
                }
            }
            tx.execute(
                "UPDATE academic_terms
                 SET year = ?1, semester = ?2, start_date = ?3, end_date = ?4
                 WHERE id = ?5",
                params![
                    term.year,
                    term.semester.number(),
                    format_date(term.start_date),
                    format_date(term.end_date),
                    id.0,
                ],
            )?;
            let stored = fetch_term(&tx, id)?.ok_or(RepositoryError::NotFound)?;
            tx.commit()?;
            Ok(Ok(stored))
        })?;
        Ok(placed?)
    }

    fn delete(&self, id: TermId) -> Result<(), RepositoryError> {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            let term = fetch_term(&tx, id)?.ok_or(RepositoryError::NotFound)?;
            let references = references(&tx, &term)?;
            if references > 0 {
                return Err(RepositoryError::InUse(format!(
                    "term {} has {references} submission(s)",
                    term.position()
                )));
            }
            tx.execute("DELETE FROM academic_terms WHERE id = ?1", params![id.0])?;
            tx.commit()?;
            Ok(())
        })
    }

    fn find(&self, id: TermId) -> Result<Option<AcademicTerm>, RepositoryError> {
        self.with_connection(|conn| fetch_term(conn, id))
    }

    fn list(&self) -> Result<Vec<AcademicTerm>, RepositoryError> {
        self.with_connection(|conn| all_terms(conn))
    }

    fn set_exclusive(&self, id: TermId, flag: TermFlag) -> Result<AcademicTerm, RepositoryError> {
        let column = flag.column();
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                &format!("UPDATE academic_terms SET {column} = 0 WHERE {column} = 1"),
                [],
            )?;
            let changed = tx.execute(
                &format!("UPDATE academic_terms SET {column} = 1 WHERE id = ?1"),
                params![id.0],
            )?;
            if changed == 0 {
                return Err(RepositoryError::NotFound);
            }
            let term = fetch_term(&tx, id)?.ok_or(RepositoryError::NotFound)?;
            tx.commit()?;
            Ok(term)
        })
    }

    fn current(&self) -> Result<Option<AcademicTerm>, RepositoryError> {
        self.with_connection(|conn| flagged(conn, "is_current = 1"))
    }

    fn registrable(&self) -> Result<Option<AcademicTerm>, RepositoryError> {
        self.with_connection(|conn| {
            flagged(conn, "is_current = 1 AND is_open_for_registration = 1")
        })
    }
}
