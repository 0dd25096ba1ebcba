//! SQLite-backed implementations of the term, submission, and audit repositories.
//!
//! Every multi-row write runs inside one `rusqlite::Transaction`. A transaction that is dropped
//! before `commit` rolls back, so an abandoned request never leaves partial rows behind.

mod audit;
pub mod schema;
mod submissions;
mod terms;

#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, Row};

use crate::config::DatabaseConfig;
use crate::workflows::RepositoryError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";
const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Shared handle to one SQLite connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let conn = Connection::open(path.as_ref())?;
        Self::initialise(conn)
    }

    pub fn in_memory() -> Result<Self, RepositoryError> {
        Self::initialise(Connection::open_in_memory()?)
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self, RepositoryError> {
        if config.is_in_memory() {
            Self::in_memory()
        } else {
            Self::open(config.path.trim())
        }
    }

    fn initialise(conn: Connection) -> Result<Self, RepositoryError> {
        schema::apply(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Round-trips a trivial query; backs the readiness route.
    pub fn ping(&self) -> Result<(), RepositoryError> {
        self.with_connection(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }

    fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| RepositoryError::Unavailable("database mutex poisoned".into()))?;
        f(&mut guard)
    }
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                RepositoryError::Conflict(err.to_string())
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound,
            _ => RepositoryError::Unavailable(err.to_string()),
        }
    }
}

pub(crate) fn format_timestamp(value: DateTime<Utc>) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn format_date(value: NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

pub(crate) fn conversion_error(
    index: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

/// Error for a stored label that no longer maps to a known variant.
#[derive(Debug, thiserror::Error)]
#[error("unrecognised stored value '{0}'")]
pub(crate) struct UnknownLabel(pub String);

pub(crate) fn timestamp_at(row: &Row<'_>, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(index)?;
    NaiveDateTime::parse_from_str(&raw, TIMESTAMP_PARSE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|err| conversion_error(index, err))
}

pub(crate) fn date_at(row: &Row<'_>, index: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(index)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|err| conversion_error(index, err))
}

/// Escape `%`, `_` and `\` so a keyword matches literally inside `LIKE ... ESCAPE '\'`.
pub(crate) fn like_pattern(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    escaped.push('%');
    for ch in keyword.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
