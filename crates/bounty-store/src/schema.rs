//! SQL DDL for the bounty ledger database.
//! WAL mode + foreign keys enabled at connection time.

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, error, info};

use crate::error::StoreError;

pub const SCHEMA_VERSION: u32 = 1;

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS assignment_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    contributor_name TEXT NOT NULL,
    maintainer_name TEXT NOT NULL,
    pull_request_url TEXT NOT NULL,
    points_allotted INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS leaderboard (
    contributor_name TEXT PRIMARY KEY,
    current_bounty INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS maintainers (
    username TEXT PRIMARY KEY
);

CREATE INDEX IF NOT EXISTS idx_records_pull_request ON assignment_records(pull_request_url, created_at);
CREATE INDEX IF NOT EXISTS idx_records_contributor ON assignment_records(contributor_name);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = NORMAL;
"#;

/// Create the ledger, leaderboard and maintainer tables if they are missing.
/// Safe to run on every start.
pub fn ensure_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(CREATE_TABLES).map_err(|e| {
        error!(error = %e, "could not create tables");
        StoreError::Schema(format!("create tables: {e}"))
    })?;

    let version: Option<u32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| StoreError::Schema(format!("read schema version: {e}")))?;

    match version {
        Some(v) => debug!(version = v, "schema already present"),
        None => {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map_err(|e| StoreError::Schema(format!("schema version: {e}")))?;
            info!(version = SCHEMA_VERSION, "schema created");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        let tables = table_names(&conn);
        for t in ["assignment_records", "leaderboard", "maintainers", "schema_version"] {
            assert!(tables.contains(&t.to_string()), "missing {t}");
        }
    }

    #[test]
    fn idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn keeps_existing_rows() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        conn.execute("INSERT INTO maintainers (username) VALUES ('alice')", [])
            .unwrap();
        ensure_schema(&conn).unwrap();
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM maintainers", [], |row| row.get(0))
            .unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn failure_is_schema_error() {
        let conn = Connection::open_in_memory().unwrap();
        // Views cannot be indexed, so the DDL batch fails.
        conn.execute_batch("CREATE VIEW assignment_records AS SELECT 1 AS x;")
            .unwrap();
        let err = ensure_schema(&conn).unwrap_err();
        assert!(matches!(err, StoreError::Schema(_)), "got: {err}");
    }
}
