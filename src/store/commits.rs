use super::{to_datetime, Store};
use crate::error::Result;
use crate::model::{Commit, DateRange, NewCommit};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use tracing::{debug, warn};

const COMMIT_COLUMNS: &str = "id, hash, author_name, author_email, timestamp, message, \
     repository_id, lines_added, lines_deleted, created_at";

fn commit_from_row(row: &Row<'_>) -> rusqlite::Result<Commit> {
    let added: i64 = row.get(7)?;
    let deleted: i64 = row.get(8)?;
    Ok(Commit {
        id: row.get(0)?,
        hash: row.get(1)?,
        author_name: row.get(2)?,
        author_email: row.get(3)?,
        timestamp: to_datetime(row.get(4)?, 4)?,
        message: row.get(5)?,
        repository_id: row.get(6)?,
        lines_added: added.max(0) as u64,
        lines_deleted: deleted.max(0) as u64,
        created_at: to_datetime(row.get(9)?, 9)?,
    })
}

/// Inserts `commit` unless `(hash, repository_id)` is already stored.
fn insert_if_absent(conn: &Connection, commit: &NewCommit, now: i64) -> rusqlite::Result<bool> {
    let exists = conn
        .prepare_cached("SELECT 1 FROM commits WHERE hash = ?1 AND repository_id = ?2")?
        .query_row(params![commit.hash, commit.repository_id], |_| Ok(()))
        .optional()?
        .is_some();
    if exists {
        return Ok(false);
    }

    conn.prepare_cached(
        "INSERT INTO commits (id, hash, author_name, author_email, timestamp, message,
                              repository_id, lines_added, lines_deleted, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?
    .execute(params![
        uuid::Uuid::new_v4().to_string(),
        commit.hash,
        commit.author_name,
        commit.author_email,
        commit.timestamp.timestamp(),
        commit.message,
        commit.repository_id,
        i64::try_from(commit.lines_added).unwrap_or(i64::MAX),
        i64::try_from(commit.lines_deleted).unwrap_or(i64::MAX),
        now,
    ])?;
    Ok(true)
}

impl Store {
    /// Stores each commit at most once per repository and returns how many
    /// rows were added. A record that fails to insert is rolled back on its
    /// own and logged; the rest of the batch still lands.
    pub fn insert_commits(&self, commits: &[NewCommit]) -> Result<usize> {
        if commits.is_empty() {
            return Ok(0);
        }

        self.with_connection(|conn| {
            let now = Utc::now().timestamp();
            let mut tx = conn.transaction()?;
            let mut inserted = 0usize;

            for commit in commits {
                let sp = tx.savepoint()?;
                match insert_if_absent(&sp, commit, now) {
                    Ok(true) => {
                        sp.commit()?;
                        inserted += 1;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!(hash = %commit.hash, repository = %commit.repository_id, error = %e,
                              "failed to store commit");
                    }
                }
            }

            tx.commit()?;
            debug!(candidates = commits.len(), inserted, "stored commit batch");
            Ok(inserted)
        })
    }

    /// Commits of one repository inside `range`, newest first.
    pub fn commits_in_range(&self, repository_id: &str, range: &DateRange) -> Result<Vec<Commit>> {
        let mut query = format!("SELECT {COMMIT_COLUMNS} FROM commits WHERE repository_id = ?");
        let mut to_bind: Vec<Box<dyn ToSql>> = vec![Box::new(repository_id.to_string())];

        if let Some(since) = &range.since {
            query.push_str(" AND timestamp >= ?");
            to_bind.push(Box::new(since.timestamp()));
        }
        if let Some(until) = &range.until {
            query.push_str(" AND timestamp < ?");
            to_bind.push(Box::new(until.timestamp()));
        }
        query.push_str(" ORDER BY timestamp DESC");

        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&query)?;
            let bind_refs: Vec<&dyn ToSql> = to_bind.iter().map(|b| b.as_ref()).collect();
            let rows = stmt.query_map(bind_refs.as_slice(), commit_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    pub fn delete_commits_for_repository(&self, repository_id: &str) -> Result<usize> {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM commits WHERE repository_id = ?1",
                params![repository_id],
            )?;
            tx.commit()?;
            Ok(removed)
        })
    }

    /// Deletes commits of every repository dated before `cutoff`.
    pub fn delete_commits_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM commits WHERE timestamp < ?1",
                params![cutoff.timestamp()],
            )?;
            tx.commit()?;
            Ok(removed)
        })
    }

    pub fn count_commits(&self, repository_id: Option<&str>) -> Result<u64> {
        self.with_connection(|conn| {
            let count: i64 = match repository_id {
                Some(id) => conn.query_row(
                    "SELECT COUNT(*) FROM commits WHERE repository_id = ?1",
                    params![id],
                    |row| row.get(0),
                )?,
                None => conn.query_row("SELECT COUNT(*) FROM commits", [], |row| row.get(0))?,
            };
            Ok(count.max(0) as u64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn new_commit(hash: &str, repo: &str, day: u32) -> NewCommit {
        NewCommit {
            hash: hash.into(),
            author_name: "Ada".into(),
            author_email: "ada@example.com".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap(),
            message: format!("commit {hash}"),
            repository_id: repo.into(),
            lines_added: 3,
            lines_deleted: 1,
        }
    }

    #[test]
    fn duplicate_hash_in_separate_batches_persists_once() {
        let store = Store::open_in_memory().unwrap();

        assert_eq!(store.insert_commits(&[new_commit("abc123", "R1", 1)]).unwrap(), 1);
        assert_eq!(store.insert_commits(&[new_commit("abc123", "R1", 1)]).unwrap(), 0);
        assert_eq!(store.count_commits(Some("R1")).unwrap(), 1);
    }

    #[test]
    fn rejected_record_does_not_abort_batch() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_connection(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER reject_bad BEFORE INSERT ON commits
                     WHEN NEW.hash = 'bad'
                     BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
                )?;
                Ok(())
            })
            .unwrap();

        let batch = [
            new_commit("a", "R1", 1),
            new_commit("bad", "R1", 2),
            new_commit("c", "R1", 3),
        ];
        assert_eq!(store.insert_commits(&batch).unwrap(), 2);
        assert_eq!(store.count_commits(Some("R1")).unwrap(), 2);

        let hashes: Vec<String> = store
            .commits_in_range("R1", &DateRange::new())
            .unwrap()
            .into_iter()
            .map(|c| c.hash)
            .collect();
        assert_eq!(hashes, vec!["c".to_string(), "a".to_string()]);
    }

    #[test]
    fn same_hash_in_other_repository_is_distinct() {
        let store = Store::open_in_memory().unwrap();
        let batch = [
            new_commit("abc123", "R1", 1),
            new_commit("abc123", "R2", 1),
            new_commit("abc123", "R1", 1),
        ];

        assert_eq!(store.insert_commits(&batch).unwrap(), 2);
        assert_eq!(store.count_commits(None).unwrap(), 2);
    }

    #[test]
    fn stored_commit_round_trips() {
        let store = Store::open_in_memory().unwrap();
        let input = new_commit("abc123", "R1", 7);
        store.insert_commits(std::slice::from_ref(&input)).unwrap();

        let stored = store.commits_in_range("R1", &DateRange::new()).unwrap();
        assert_eq!(stored.len(), 1);
        let c = &stored[0];
        assert_eq!(c.hash, input.hash);
        assert_eq!(c.timestamp, input.timestamp);
        assert_eq!(c.message, input.message);
        assert_eq!((c.lines_added, c.lines_deleted), (3, 1));
        assert!(!c.id.is_empty());
    }

    #[test]
    fn range_query_is_half_open_and_newest_first() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_commits(&[
                new_commit("a", "R1", 1),
                new_commit("b", "R1", 2),
                new_commit("c", "R1", 3),
                new_commit("d", "R2", 2),
            ])
            .unwrap();

        let range = DateRange::between(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 3, 12, 0, 0).unwrap(),
        );
        let hashes: Vec<_> = store
            .commits_in_range("R1", &range)
            .unwrap()
            .into_iter()
            .map(|c| c.hash)
            .collect();
        assert_eq!(hashes, vec!["b", "a"]);
    }

    #[test]
    fn bulk_deletes() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_commits(&[
                new_commit("a", "R1", 1),
                new_commit("b", "R1", 10),
                new_commit("c", "R2", 2),
                new_commit("d", "R2", 20),
            ])
            .unwrap();

        let cutoff = Utc.with_ymd_and_hms(2024, 5, 5, 0, 0, 0).unwrap();
        assert_eq!(store.delete_commits_older_than(cutoff).unwrap(), 2);
        assert_eq!(store.delete_commits_for_repository("R1").unwrap(), 1);
        assert_eq!(store.count_commits(None).unwrap(), 1);
        assert_eq!(store.count_commits(Some("R2")).unwrap(), 1);
    }

    #[test]
    fn concurrent_insert_and_read() {
        let store = Store::open_in_memory().unwrap();
        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for day in 1..=20 {
                    store
                        .insert_commits(&[new_commit(&format!("h{day}"), "R1", day)])
                        .unwrap();
                }
            })
        };
        for _ in 0..20 {
            store.commits_in_range("R1", &DateRange::new()).unwrap();
        }
        writer.join().unwrap();
        assert_eq!(store.count_commits(Some("R1")).unwrap(), 20);
    }
}
