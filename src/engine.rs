//! Database capability used by the collector and the inference adapter.
//!
//! The pipeline only reads: it asks the planner for plan steps and runs
//! queries to completion. Seeding the database happens elsewhere.

use crate::error::Result;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::debug;

/// A database that can explain and execute read queries.
pub trait QueryEngine {
    /// Ordered plan-step records for `sql`, each rendered as text fields.
    fn explain(&self, sql: &str) -> Result<Vec<Vec<String>>>;

    /// Run `sql`, reading every column of every row. Returns the row count.
    fn execute(&self, sql: &str) -> Result<usize>;
}

/// SQLite-backed engine using `EXPLAIN QUERY PLAN`.
pub struct SqliteEngine {
    conn: Connection,
}

impl SqliteEngine {
    /// Open an existing database file read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI,
        )?;
        debug!("Opened {} read-only", path.display());
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl QueryEngine for SqliteEngine {
    fn explain(&self, sql: &str) -> Result<Vec<Vec<String>>> {
        let mut stmt = self.conn.prepare(&format!("EXPLAIN QUERY PLAN {}", sql))?;
        let columns = stmt.column_count();
        let mut rows = stmt.query([])?;

        let mut steps = Vec::new();
        while let Some(row) = rows.next()? {
            let mut fields = Vec::with_capacity(columns);
            for idx in 0..columns {
                fields.push(render(row.get_ref(idx)?));
            }
            steps.push(fields);
        }
        Ok(steps)
    }

    fn execute(&self, sql: &str) -> Result<usize> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns = stmt.column_count();
        let mut rows = stmt.query([])?;

        let mut count = 0;
        while let Some(row) = rows.next()? {
            for idx in 0..columns {
                row.get_ref(idx)?;
            }
            count += 1;
        }
        Ok(count)
    }
}

fn render(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => String::from_utf8_lossy(b).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SqliteEngine {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE users(user_id INTEGER PRIMARY KEY, country TEXT);
             CREATE INDEX idx_users_country ON users(country);
             INSERT INTO users VALUES (1,'US'),(2,'IN'),(3,'US');",
        )
        .unwrap();
        SqliteEngine::from_connection(conn)
    }

    #[test]
    fn test_explain_rows_have_detail_field() {
        let steps = engine().explain("SELECT * FROM users WHERE country = 'US'").unwrap();
        assert!(!steps.is_empty());
        assert!(steps.iter().all(|s| s.len() >= 4));
        assert!(steps[0][3].to_lowercase().contains("users"));
    }

    #[test]
    fn test_execute_counts_rows() {
        let e = engine();
        assert_eq!(e.execute("SELECT * FROM users WHERE country='US';").unwrap(), 2);
        assert_eq!(e.execute("SELECT * FROM users WHERE country='XX'").unwrap(), 0);
    }

    #[test]
    fn test_invalid_sql_is_execution_error() {
        let err = engine().explain("SELECT * FROM missing").unwrap_err();
        assert!(matches!(err, crate::error::CompareError::Execution { side: None, .. }));
    }
}
