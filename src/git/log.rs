use super::exec::GitRunner;
use super::parse::{parse_log, COMMIT_SENTINEL};
use crate::error::GitError;
use crate::model::{DateRange, NewCommit, Repository};
use chrono::{SecondsFormat, TimeDelta};
use std::path::Path;
use tracing::debug;

/// Reads commit history of a repository through `git log`.
#[derive(Debug, Clone, Default)]
pub struct LogExtractor {
    runner: GitRunner,
}

impl LogExtractor {
    pub fn new(runner: GitRunner) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &GitRunner {
        &self.runner
    }

    /// Raw `git log` output for every ref, restricted to `range` and
    /// optionally to authors matching `author`.
    pub async fn extract(
        &self,
        repo_path: &Path,
        range: &DateRange,
        author: Option<&str>,
    ) -> Result<String, GitError> {
        let args = log_args(range, author);
        debug!(repo = %repo_path.display(), ?args, "extracting commit log");
        self.runner.run(repo_path, &args).await
    }

    /// Extracts and parses the history of `repo`. Commits whose timestamp
    /// falls outside `range` are dropped.
    pub async fn fetch(
        &self,
        repo: &Repository,
        range: &DateRange,
        author: Option<&str>,
    ) -> Result<Vec<NewCommit>, GitError> {
        let raw = self.extract(&repo.path, range, author).await?;
        let mut commits = parse_log(&raw, &repo.id);
        commits.retain(|c| range.contains(&c.timestamp));
        Ok(commits)
    }
}

pub(crate) fn log_args(range: &DateRange, author: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "log".to_string(),
        "--all".to_string(),
        "--no-color".to_string(),
        "--date=iso-strict".to_string(),
        format!("--pretty=format:{COMMIT_SENTINEL}%H|%an|%ae|%ad|%s"),
        "--numstat".to_string(),
    ];

    if let Some(since) = range.since {
        args.push(format!("--since={}", since.to_rfc3339_opts(SecondsFormat::Secs, true)));
    }
    // git treats --until as inclusive
    if let Some(until) = range.until {
        let last = until - TimeDelta::seconds(1);
        args.push(format!("--until={}", last.to_rfc3339_opts(SecondsFormat::Secs, true)));
    }
    if let Some(author) = author.filter(|a| !a.is_empty()) {
        args.push(format!("--author={author}"));
    }

    args
}
