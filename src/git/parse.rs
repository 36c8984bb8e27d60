//! Parser for the custom `git log` format requested by [`super::log`].
//!
//! Each commit starts with a header line
//! `COMMIT_START|<hash>|<author>|<email>|<iso date>|<subject>` followed by
//! `--numstat` lines (`added<TAB>deleted<TAB>path`). Malformed headers, bad
//! dates and non-numeric stat lines are dropped without failing the parse.

use crate::model::NewCommit;
use chrono::{DateTime, Utc};

pub const COMMIT_SENTINEL: &str = "COMMIT_START|";

const FIELD_SEPARATOR: char = '|';
const HEADER_FIELDS: usize = 5;

pub fn parse_log(raw: &str, repository_id: &str) -> Vec<NewCommit> {
    let mut commits = Vec::new();
    let mut current: Option<NewCommit> = None;

    for line in raw.lines() {
        if let Some(header) = line.strip_prefix(COMMIT_SENTINEL) {
            commits.extend(current.take());
            current = parse_header(header, repository_id);
            continue;
        }

        // stat lines after a rejected header belong to nothing
        if let Some(commit) = current.as_mut() {
            if let Some((added, deleted)) = parse_numstat(line) {
                commit.lines_added += added;
                commit.lines_deleted += deleted;
            }
        }
    }

    commits.extend(current);
    commits
}

fn parse_header(header: &str, repository_id: &str) -> Option<NewCommit> {
    let fields: Vec<&str> = header.splitn(HEADER_FIELDS, FIELD_SEPARATOR).collect();
    if fields.len() < HEADER_FIELDS {
        return None;
    }

    let hash = fields[0].trim();
    if hash.is_empty() {
        return None;
    }

    let timestamp = DateTime::parse_from_rfc3339(fields[3].trim())
        .ok()?
        .with_timezone(&Utc);

    Some(NewCommit {
        hash: hash.to_string(),
        author_name: fields[1].to_string(),
        author_email: fields[2].to_string(),
        timestamp,
        message: fields[4].to_string(),
        repository_id: repository_id.to_string(),
        lines_added: 0,
        lines_deleted: 0,
    })
}

/// Binary files report `-` for both counts and yield `None`.
fn parse_numstat(line: &str) -> Option<(u64, u64)> {
    let mut parts = line.split('\t');
    let added = parts.next()?.trim().parse::<u64>().ok()?;
    let deleted = parts.next()?.trim().parse::<u64>().ok()?;
    Some((added, deleted))
}
