use super::{to_datetime, Store};
use crate::error::Result;
use crate::model::Repository;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const REPOSITORY_COLUMNS: &str =
    "id, name, path, active, remote_url, last_scanned_at, created_at, updated_at";

fn repository_from_row(row: &Row<'_>) -> rusqlite::Result<Repository> {
    let path: String = row.get(2)?;
    let active: i64 = row.get(3)?;
    let last_scanned: Option<i64> = row.get(5)?;
    Ok(Repository {
        id: row.get(0)?,
        name: row.get(1)?,
        path: PathBuf::from(path),
        active: active != 0,
        remote_url: row.get(4)?,
        last_scanned_at: last_scanned.map(|s| to_datetime(s, 5)).transpose()?,
        created_at: to_datetime(row.get(6)?, 6)?,
        updated_at: to_datetime(row.get(7)?, 7)?,
    })
}

impl Store {
    pub fn insert_repository(&self, repo: &Repository) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO repositories (id, name, path, active, remote_url, last_scanned_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    repo.id,
                    repo.name,
                    repo.path.to_string_lossy().into_owned(),
                    repo.active as i64,
                    repo.remote_url,
                    repo.last_scanned_at.map(|t| t.timestamp()),
                    repo.created_at.timestamp(),
                    repo.updated_at.timestamp(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn list_repositories(&self) -> Result<Vec<Repository>> {
        self.query_repositories(&format!(
            "SELECT {REPOSITORY_COLUMNS} FROM repositories ORDER BY name, path"
        ))
    }

    pub fn active_repositories(&self) -> Result<Vec<Repository>> {
        self.query_repositories(&format!(
            "SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE active = 1 ORDER BY name, path"
        ))
    }

    fn query_repositories(&self, sql: &str) -> Result<Vec<Repository>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map([], repository_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    pub fn get_repository(&self, id: &str) -> Result<Option<Repository>> {
        self.with_connection(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE id = ?1"),
                    params![id],
                    repository_from_row,
                )
                .optional()?)
        })
    }

    pub fn find_repository_by_path(&self, path: &Path) -> Result<Option<Repository>> {
        self.with_connection(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE path = ?1"),
                    params![path.to_string_lossy().into_owned()],
                    repository_from_row,
                )
                .optional()?)
        })
    }

    pub fn known_paths(&self) -> Result<HashSet<PathBuf>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT path FROM repositories")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            Ok(rows
                .map(|r| r.map(PathBuf::from))
                .collect::<rusqlite::Result<HashSet<_>>>()?)
        })
    }

    /// Returns `false` when no repository has `id`.
    pub fn set_repository_active(&self, id: &str, active: bool) -> Result<bool> {
        self.with_connection(|conn| {
            let changed = conn.execute(
                "UPDATE repositories SET active = ?1, updated_at = ?2 WHERE id = ?3",
                params![active as i64, Utc::now().timestamp(), id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn mark_scanned(
        &self,
        id: &str,
        remote_url: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_connection(|conn| {
            let changed = conn.execute(
                "UPDATE repositories
                 SET remote_url = COALESCE(?1, remote_url), last_scanned_at = ?2, updated_at = ?2
                 WHERE id = ?3",
                params![remote_url, at.timestamp(), id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Removes the repository and every commit that references it.
    pub fn delete_repository(&self, id: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM commits WHERE repository_id = ?1", params![id])?;
            let removed = tx.execute("DELETE FROM repositories WHERE id = ?1", params![id])?;
            tx.commit()?;
            Ok(removed > 0)
        })
    }
}
