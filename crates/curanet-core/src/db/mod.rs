//! Database layer for the portal.
//!
//! Every multi-step write runs inside [`Database::begin_immediate`], which
//! takes SQLite's write lock up front. Combined with the UNIQUE constraints in
//! [`SCHEMA`] this keeps check-then-insert sequences race free even when
//! several connections share one database file.

mod schema;
mod accounts;
mod appointments;
mod clinical;
mod directory;
mod emergency;
mod patients;

pub use schema::*;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// How long a connection waits for another writer before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A UNIQUE constraint rejected the write.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.busy_timeout(BUSY_TIMEOUT)?;
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a write transaction, taking the database write lock immediately.
    ///
    /// All `Database` methods called while the returned guard is alive run
    /// inside it. Dropping the guard without `commit()` rolls everything back.
    pub fn begin_immediate(&self) -> DbResult<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

/// Whether an error came from a UNIQUE constraint (or unique index).
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}

/// `%keyword%` for a `LIKE ... ESCAPE '\'` clause, with the keyword's own
/// wildcards matched literally.
pub(crate) fn contains_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Map a UNIQUE violation to [`DbError::Constraint`], anything else to `Sqlite`.
pub(crate) fn unique_or_sqlite(err: rusqlite::Error, what: &str) -> DbError {
    if is_unique_violation(&err) {
        DbError::Constraint(what.to_string())
    } else {
        DbError::Sqlite(err)
    }
}
