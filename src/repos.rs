use crate::cli::CommonArgs;
use crate::git::{is_git_repository, RepositoryLocator};
use crate::model::Repository;
use crate::store::Store;
use anyhow::{bail, Context};
use chrono::{Local, Utc};
use console::style;
use std::path::{Path, PathBuf};
use tracing::info;

fn open_store(common: &CommonArgs) -> anyhow::Result<(crate::config::Config, Store)> {
    let config = common.config()?;
    let store = Store::open(&config.database).context("Failed to open database")?;
    Ok((config, store))
}

pub async fn exec_scan(common: CommonArgs, base: PathBuf, no_remote: bool, json: bool) -> anyhow::Result<()> {
    let (config, store) = open_store(&common)?;
    let runner = config.runner().context("Failed to configure git")?;
    let locator = RepositoryLocator::new(runner).resolve_remote(!no_remote);

    let base = base.canonicalize().unwrap_or(base);
    let known = store.known_paths().context("Failed to read known repositories")?;
    let discovered = locator.scan(&base, &known).await;

    let now = Utc::now();
    let mut added = Vec::with_capacity(discovered.len());
    for found in discovered {
        let mut repo = found.into_repository();
        repo.last_scanned_at = Some(now);
        store
            .insert_repository(&repo)
            .with_context(|| format!("Failed to register {}", repo.path.display()))?;
        added.push(repo);
    }

    // refresh repositories under `base` that were already registered
    let mut refreshed = 0usize;
    for repo in store.list_repositories()? {
        if repo.path.parent() == Some(base.as_path()) && !added.iter().any(|a| a.id == repo.id) {
            let remote = if no_remote { None } else { locator.remote_url(&repo.path).await };
            store.mark_scanned(&repo.id, remote.as_deref(), now)?;
            refreshed += 1;
        }
    }

    info!(base = %base.display(), added = added.len(), refreshed, "scan finished");

    if json {
        println!("{}", serde_json::to_string_pretty(&added)?);
        return Ok(());
    }

    if added.is_empty() {
        println!("No new repositories under {}", base.display());
    } else {
        println!("{}", style(format!("Registered {} repositories", added.len())).bold());
        print_repositories(&added);
    }
    if refreshed > 0 {
        println!("Refreshed {refreshed} known repositories");
    }
    Ok(())
}

pub fn exec_list(common: CommonArgs, json: bool) -> anyhow::Result<()> {
    let (_, store) = open_store(&common)?;
    let repos = store.list_repositories()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&repos)?);
    } else if repos.is_empty() {
        println!("No repositories registered");
    } else {
        print_repositories(&repos);
    }
    Ok(())
}

pub async fn exec_add(common: CommonArgs, path: PathBuf) -> anyhow::Result<()> {
    let (config, store) = open_store(&common)?;
    let path = path
        .canonicalize()
        .with_context(|| format!("Cannot access {}", path.display()))?;

    if !is_git_repository(&path) {
        bail!("{} is not a git repository", path.display());
    }
    if let Some(existing) = store.find_repository_by_path(&path)? {
        println!("Already registered as {}", existing.id);
        return Ok(());
    }

    let runner = config.runner().context("Failed to configure git")?;
    let remote = RepositoryLocator::new(runner).remote_url(&path).await;
    let mut repo = Repository::new(repo_name(&path), path, remote);
    repo.last_scanned_at = Some(Utc::now());
    store.insert_repository(&repo)?;

    println!("Registered {} as {}", repo.name, style(&repo.id).cyan());
    Ok(())
}

pub fn exec_set_active(common: CommonArgs, id: String, active: bool) -> anyhow::Result<()> {
    let (_, store) = open_store(&common)?;
    if !store.set_repository_active(&id, active)? {
        bail!("Unknown repository id {id}");
    }
    println!("{} {}", if active { "Enabled" } else { "Disabled" }, id);
    Ok(())
}

pub fn exec_remove(common: CommonArgs, id: String) -> anyhow::Result<()> {
    let (_, store) = open_store(&common)?;
    let commits = store.count_commits(Some(&id))?;
    if !store.delete_repository(&id)? {
        bail!("Unknown repository id {id}");
    }
    println!("Removed {id} and {commits} commits");
    Ok(())
}

pub fn exec_forget(common: CommonArgs, id: String) -> anyhow::Result<()> {
    let (_, store) = open_store(&common)?;
    if store.get_repository(&id)?.is_none() {
        bail!("Unknown repository id {id}");
    }
    let removed = store.delete_commits_for_repository(&id)?;
    println!("Deleted {removed} commits of {id}");
    Ok(())
}

pub fn exec_prune(common: CommonArgs, older_than: String) -> anyhow::Result<()> {
    let (_, store) = open_store(&common)?;
    let cutoff = crate::util::parse_date(&older_than, &Utc::now(), &Local)
        .context("Failed to parse cutoff")?;
    let removed = store.delete_commits_older_than(cutoff)?;
    println!(
        "Deleted {removed} commits older than {}",
        cutoff.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
    Ok(())
}

fn repo_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn print_repositories(repos: &[Repository]) {
    println!(
        "{:<36} {:<24} {:<6} {}",
        style("Id").bold(),
        style("Name").bold(),
        style("Active").bold(),
        style("Path").bold()
    );
    println!("{}", "─".repeat(98));
    for repo in repos {
        let active = if repo.active { style("yes").green() } else { style("no").dim() };
        println!(
            "{:<36} {:<24} {:<6} {}",
            repo.id,
            repo.name,
            active,
            repo.path.display()
        );
        if let Some(remote) = &repo.remote_url {
            println!("{:<36} {}", "", style(remote).dim());
        }
    }
}
