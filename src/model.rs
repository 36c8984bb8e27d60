use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const SCHEMA_VERSION: u32 = 1;

/// Length of the abbreviated hash shown in listings.
pub const SHORT_HASH_LEN: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    pub active: bool,
    pub remote_url: Option<String>,
    pub last_scanned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Repository {
    pub fn new(name: String, path: PathBuf, remote_url: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            path,
            active: true,
            remote_url,
            last_scanned_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A repository found on disk that has not been registered yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredRepository {
    pub name: String,
    pub path: PathBuf,
    pub remote_url: Option<String>,
}

impl DiscoveredRepository {
    pub fn into_repository(self) -> Repository {
        Repository::new(self.name, self.path, self.remote_url)
    }
}

/// A commit as parsed from `git log`, before it has been given a storage identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCommit {
    pub hash: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub repository_id: String,
    pub lines_added: u64,
    pub lines_deleted: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub id: String,
    pub hash: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub repository_id: String,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub created_at: DateTime<Utc>,
}

impl Commit {
    pub fn short_hash(&self) -> &str {
        let end = self
            .hash
            .char_indices()
            .nth(SHORT_HASH_LEN)
            .map(|(i, _)| i)
            .unwrap_or(self.hash.len());
        &self.hash[..end]
    }

    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    pub fn total_lines(&self) -> u64 {
        self.lines_added + self.lines_deleted
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayStats {
    pub commit_count: u32,
    pub lines_added: u64,
    pub lines_deleted: u64,
}

impl DayStats {
    pub fn add(&mut self, commit: &Commit) {
        self.commit_count += 1;
        self.lines_added += commit.lines_added;
        self.lines_deleted += commit.lines_deleted;
    }

    pub fn lines_changed(&self) -> u64 {
        self.lines_added + self.lines_deleted
    }
}

/// Statistics keyed by local calendar day.
pub type DayBuckets = BTreeMap<NaiveDate, DayStats>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayBucket {
    pub day: NaiveDate,
    #[serde(flatten)]
    pub stats: DayStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub window_days: u32,
    pub repositories: Vec<String>,
    pub author: Option<String>,
    pub days: Vec<DayBucket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitEntry {
    pub hash: String,
    pub short_hash: String,
    pub repository: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    pub subject: String,
    pub lines_added: u64,
    pub lines_deleted: u64,
}

/// Half-open time window `[since, until)`. A missing bound is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new() -> Self {
        Self { since: None, until: None }
    }

    pub fn between(since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self { since: Some(since), until: Some(until) }
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        if let Some(since) = self.since {
            if timestamp < &since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if timestamp >= &until {
                return false;
            }
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        matches!((self.since, self.until), (Some(s), Some(u)) if s >= u)
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn commit(hash: &str, message: &str) -> Commit {
        Commit {
            id: "c1".into(),
            hash: hash.into(),
            author_name: "Ada".into(),
            author_email: "ada@example.com".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            message: message.into(),
            repository_id: "r1".into(),
            lines_added: 4,
            lines_deleted: 2,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn derived_commit_values() {
        let c = commit("0123456789abcdef", "first line\n\nbody text");
        assert_eq!(c.short_hash(), "0123456");
        assert_eq!(c.subject(), "first line");
        assert_eq!(c.total_lines(), 6);

        let short = commit("abc", "");
        assert_eq!(short.short_hash(), "abc");
        assert_eq!(short.subject(), "");
    }

    #[test]
    fn range_is_half_open() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        let range = DateRange::between(start, end);
        assert!(range.contains(&start));
        assert!(!range.contains(&end));
        assert!(DateRange::new().contains(&end));
        assert!(DateRange::between(end, start).is_empty());
    }
}
