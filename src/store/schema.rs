use crate::error::{PulseError, Result};
use crate::model::SCHEMA_VERSION;
use rusqlite::Connection;

pub(super) fn initialize(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS repositories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            path TEXT NOT NULL UNIQUE,
            active INTEGER NOT NULL DEFAULT 1,
            remote_url TEXT,
            last_scanned_at INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS commits (
            id TEXT PRIMARY KEY,
            hash TEXT NOT NULL,
            author_name TEXT NOT NULL,
            author_email TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            message TEXT NOT NULL,
            repository_id TEXT NOT NULL,
            lines_added INTEGER NOT NULL DEFAULT 0,
            lines_deleted INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_commits_hash_repo ON commits(hash, repository_id);
        CREATE INDEX IF NOT EXISTS idx_commits_timestamp ON commits(timestamp);
        CREATE INDEX IF NOT EXISTS idx_commits_repository ON commits(repository_id);
        ",
    )?;
    check_schema_version(conn)
}

fn check_schema_version(conn: &mut Connection) -> Result<()> {
    let user_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;

    if user_version == 0 {
        conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    } else if user_version != i64::from(SCHEMA_VERSION) {
        return Err(PulseError::Other(format!(
            "Schema version mismatch: expected {SCHEMA_VERSION}, found {user_version}"
        )));
    }

    Ok(())
}
