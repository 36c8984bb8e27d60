use crate::cli::CommonArgs;
use crate::error::{PulseError, Result};
use crate::git::LogExtractor;
use crate::model::{DateRange, NewCommit, Repository};
use crate::store::Store;
use anyhow::Context;
use chrono::{Local, Utc};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

/// Snapshot of a running import, published after every repository/author pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportProgress {
    pub total: usize,
    pub completed: usize,
    pub current: Option<String>,
    pub commits_imported: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportFailure {
    pub repository: String,
    pub author: Option<String>,
    pub error: String,
    pub timed_out: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub repositories: usize,
    pub removed: usize,
    pub parsed: usize,
    pub inserted: usize,
    pub failures: Vec<ImportFailure>,
}

/// Commits read for one repository/author pair and how many were new.
#[derive(Debug, Clone)]
pub struct ImportedBatch {
    pub commits: Vec<NewCommit>,
    pub inserted: usize,
}

#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub repositories: Vec<Repository>,
    /// Empty means no author filter.
    pub authors: Vec<String>,
    pub range: DateRange,
    /// Drop stored commits of the selected repositories first.
    pub replace: bool,
}

pub struct Importer {
    store: Store,
    extractor: LogExtractor,
    progress: watch::Sender<ImportProgress>,
}

impl Importer {
    pub fn new(store: Store, extractor: LogExtractor) -> Self {
        let (progress, _) = watch::channel(ImportProgress::default());
        Self {
            store,
            extractor,
            progress,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ImportProgress> {
        self.progress.subscribe()
    }

    /// Reads one repository's history for `range` and stores new commits.
    pub async fn import_commits(
        &self,
        repo: &Repository,
        range: &DateRange,
        author: Option<&str>,
    ) -> Result<ImportedBatch> {
        let commits = self.extractor.fetch(repo, range, author).await?;
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            let inserted = store.insert_commits(&commits)?;
            Ok::<_, PulseError>(ImportedBatch { commits, inserted })
        })
        .await
        .map_err(|e| PulseError::Other(format!("commit insert task failed: {e}")))?
    }

    /// Imports every repository × author pair one at a time. A failing pair
    /// is logged and recorded, and the run moves on.
    pub async fn run(&self, request: &ImportRequest, bar: &ProgressBar) -> ImportSummary {
        let authors: Vec<Option<&str>> = if request.authors.is_empty() {
            vec![None]
        } else {
            request.authors.iter().map(|a| Some(a.as_str())).collect()
        };
        let total = request.repositories.len() * authors.len();

        let mut summary = ImportSummary {
            repositories: request.repositories.len(),
            ..ImportSummary::default()
        };
        self.progress.send_modify(|p| *p = ImportProgress { total, ..ImportProgress::default() });
        bar.set_length(total as u64);

        if request.replace {
            for repo in &request.repositories {
                match self.store.delete_commits_for_repository(&repo.id) {
                    Ok(n) => summary.removed += n,
                    Err(e) => {
                        warn!(repository = %repo.name, error = %e, "failed to clear commits");
                        summary.failures.push(ImportFailure {
                            repository: repo.name.clone(),
                            author: None,
                            error: e.to_string(),
                            timed_out: false,
                        });
                    }
                }
            }
        }

        for repo in &request.repositories {
            for author in &authors {
                let label = match author {
                    Some(a) => format!("{} ({a})", repo.name),
                    None => repo.name.clone(),
                };
                bar.set_message(label.clone());
                self.progress.send_modify(|p| p.current = Some(label.clone()));

                match self.import_commits(repo, &request.range, *author).await {
                    Ok(batch) => {
                        summary.parsed += batch.commits.len();
                        summary.inserted += batch.inserted;
                    }
                    Err(e) => {
                        warn!(
                            repository = %repo.name,
                            author = ?author,
                            timed_out = e.is_timeout(),
                            error = %e,
                            "import skipped"
                        );
                        summary.failures.push(ImportFailure {
                            repository: repo.name.clone(),
                            author: author.map(str::to_string),
                            error: e.to_string(),
                            timed_out: e.is_timeout(),
                        });
                    }
                }

                let imported = summary.inserted;
                self.progress.send_modify(|p| {
                    p.completed += 1;
                    p.commits_imported = imported;
                });
                bar.inc(1);
            }
        }

        self.progress.send_modify(|p| p.current = None);
        info!(
            repositories = summary.repositories,
            parsed = summary.parsed,
            inserted = summary.inserted,
            failures = summary.failures.len(),
            "import finished"
        );
        summary
    }
}

pub async fn exec(
    common: CommonArgs,
    repo_ids: Vec<String>,
    authors: Vec<String>,
    since: Option<String>,
    until: Option<String>,
    keep: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = common.config()?;
    let store = Store::open(&config.database).context("Failed to open database")?;
    let runner = config.runner().context("Failed to configure git")?;

    let range = crate::util::resolve_range(since.as_deref(), until.as_deref(), &Utc::now(), &Local)
        .context("Failed to resolve date range")?;

    let repositories = if repo_ids.is_empty() {
        store.active_repositories()?
    } else {
        let mut selected = Vec::with_capacity(repo_ids.len());
        for id in &repo_ids {
            let repo = store
                .get_repository(id)?
                .with_context(|| format!("Unknown repository id {id}"))?;
            selected.push(repo);
        }
        selected
    };

    if repositories.is_empty() {
        println!("No repositories to import. Run `gitpulse scan <DIR>` first.");
        return Ok(());
    }

    let authors = if authors.is_empty() { config.authors.clone() } else { authors };
    let request = ImportRequest {
        repositories,
        authors,
        range,
        replace: !keep,
    };

    let bar = if json { ProgressBar::hidden() } else { ProgressBar::new(0) };
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let importer = Importer::new(store, LogExtractor::new(runner));
    let summary = importer.run(&request, &bar).await;
    bar.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "Imported {} new commits ({} read) from {} repositories",
        style(summary.inserted).green(),
        summary.parsed,
        summary.repositories
    );
    if summary.removed > 0 {
        println!("Replaced {} previously stored commits", summary.removed);
    }
    for failure in &summary.failures {
        let who = failure.author.as_deref().map(|a| format!(" ({a})")).unwrap_or_default();
        println!(
            "  {} {}{}: {}",
            style("skipped").yellow(),
            failure.repository,
            who,
            failure.error
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::GitRunner;
    use std::path::PathBuf;
    use std::time::Duration;

    #[tokio::test]
    async fn failing_pairs_do_not_abort_the_run() {
        let store = Store::open_in_memory().unwrap();
        let repo = Repository::new("ghost".into(), PathBuf::from("/nonexistent/ghost"), None);
        store.insert_repository(&repo).unwrap();

        let runner = GitRunner::new("gitpulse-no-such-binary", Duration::from_secs(1));
        let importer = Importer::new(store, LogExtractor::new(runner));
        let progress = importer.subscribe();

        let request = ImportRequest {
            repositories: vec![repo.clone(), repo],
            authors: vec!["Ada".into(), "Grace".into()],
            range: DateRange::new(),
            replace: true,
        };
        let summary = importer.run(&request, &ProgressBar::hidden()).await;

        assert_eq!(summary.failures.len(), 4);
        assert!(summary.failures.iter().all(|f| !f.timed_out));
        assert_eq!(summary.inserted, 0);
        let last = progress.borrow().clone();
        assert_eq!(last.total, 4);
        assert_eq!(last.completed, 4);
        assert_eq!(last.current, None);
    }

    /// Stands in for git: hangs in directories holding a `slow` marker and
    /// prints nothing elsewhere.
    #[cfg(unix)]
    fn stalling_git(dir: &std::path::Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let script = dir.join("fake-git");
        std::fs::write(&script, "#!/bin/sh\nif [ -e slow ]; then sleep 5; fi\nexit 0\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timed_out_pair_is_recorded_and_run_continues() {
        let tools = tempfile::tempdir().unwrap();
        let slow_dir = tempfile::tempdir().unwrap();
        let fast_dir = tempfile::tempdir().unwrap();
        std::fs::write(slow_dir.path().join("slow"), "").unwrap();

        let store = Store::open_in_memory().unwrap();
        let slow = Repository::new("slow".into(), slow_dir.path().to_path_buf(), None);
        let fast = Repository::new("fast".into(), fast_dir.path().to_path_buf(), None);
        store.insert_repository(&slow).unwrap();
        store.insert_repository(&fast).unwrap();

        let script = stalling_git(tools.path());
        let runner = GitRunner::new(script.to_string_lossy(), Duration::from_millis(300));
        let importer = Importer::new(store, LogExtractor::new(runner));
        let progress = importer.subscribe();

        let request = ImportRequest {
            repositories: vec![slow, fast],
            authors: Vec::new(),
            range: DateRange::new(),
            replace: false,
        };
        let started = std::time::Instant::now();
        let summary = importer.run(&request, &ProgressBar::hidden()).await;

        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].repository, "slow");
        assert!(summary.failures[0].timed_out);
        assert_eq!(progress.borrow().completed, 2);
    }
}
