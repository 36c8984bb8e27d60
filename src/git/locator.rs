use super::exec::GitRunner;
use crate::model::DiscoveredRepository;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const GIT_MARKER: &str = ".git";

/// Finds git repositories one level below a base directory.
#[derive(Debug, Clone)]
pub struct RepositoryLocator {
    runner: GitRunner,
    resolve_remote: bool,
}

impl RepositoryLocator {
    pub fn new(runner: GitRunner) -> Self {
        Self {
            runner,
            resolve_remote: true,
        }
    }

    pub fn resolve_remote(mut self, resolve: bool) -> Self {
        self.resolve_remote = resolve;
        self
    }

    /// Lists immediate children of `base` that hold a `.git` entry, skipping
    /// paths in `known`. A missing or unreadable `base` yields nothing.
    pub async fn scan(&self, base: &Path, known: &HashSet<PathBuf>) -> Vec<DiscoveredRepository> {
        let mut found = Vec::new();

        for path in candidate_dirs(base) {
            if known.contains(&path) {
                debug!(path = %path.display(), "skipping known repository");
                continue;
            }

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned());

            let remote_url = if self.resolve_remote {
                self.remote_url(&path).await
            } else {
                None
            };

            found.push(DiscoveredRepository {
                name,
                path,
                remote_url,
            });
        }

        found
    }

    /// The configured `origin` URL, or `None` if git cannot tell.
    pub async fn remote_url(&self, repo_path: &Path) -> Option<String> {
        match self
            .runner
            .run(repo_path, ["config", "--get", "remote.origin.url"])
            .await
        {
            Ok(out) => Some(out.trim().to_string()).filter(|url| !url.is_empty()),
            Err(e) => {
                debug!(path = %repo_path.display(), error = %e, "no remote origin");
                None
            }
        }
    }
}

pub fn is_git_repository(dir: &Path) -> bool {
    dir.join(GIT_MARKER).exists()
}

fn candidate_dirs(base: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(base) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(base = %base.display(), error = %e, "cannot read scan directory");
            return Vec::new();
        }
    };

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && is_git_repository(path))
        .collect();
    dirs.sort();
    dirs
}
