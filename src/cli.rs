use crate::config::{Config, MAX_WINDOW_DAYS};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gitpulse")]
#[command(about = "Collect commits from local git repositories and show daily activity")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone, Debug, Default)]
pub struct CommonArgs {
    #[arg(long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Path to commit database")]
    pub db: Option<PathBuf>,

    #[arg(long, global = true, help = "Git executable to run")]
    pub git: Option<String>,

    #[arg(long, global = true, help = "Timeout per git invocation (e.g. 10s, 1m)")]
    pub timeout: Option<String>,

    #[arg(short, long, global = true, help = "Enable debug logging")]
    pub verbose: bool,
}

impl CommonArgs {
    /// Config file values with command line overrides applied.
    pub fn config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref()).context("Failed to load config")?;
        if let Some(db) = &self.db {
            config.database = db.clone();
        }
        if let Some(git) = &self.git {
            config.git.program = git.clone();
        }
        if let Some(timeout) = &self.timeout {
            config.git.timeout = timeout.clone();
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register git repositories found directly under a directory
    Scan {
        #[arg(help = "Directory whose children are checked")]
        base: PathBuf,

        #[arg(long, help = "Skip resolving origin remote URLs")]
        no_remote: bool,

        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    /// Manage registered repositories
    Repos {
        #[command(subcommand)]
        command: RepoCommands,
    },
    /// Read commits from git into the database
    Import {
        #[arg(long = "repo", help = "Repository id (repeatable, default: all active)")]
        repos: Vec<String>,

        #[arg(long = "author", help = "Author filter passed to git (repeatable)")]
        authors: Vec<String>,

        #[arg(long, help = "Start date (RFC3339, YYYY-MM-DD, or natural language)")]
        since: Option<String>,

        #[arg(long, help = "End date, exclusive (RFC3339, YYYY-MM-DD, or natural language)")]
        until: Option<String>,

        #[arg(long, help = "Keep stored commits instead of replacing them")]
        keep: bool,

        #[arg(long, help = "Output summary as JSON")]
        json: bool,
    },
    /// Daily commit heat map over a trailing window
    Heat {
        #[arg(
            long,
            value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_WINDOW_DAYS)),
            help = "Number of days to show, ending today"
        )]
        days: Option<u32>,

        #[arg(long = "repo", help = "Repository id (repeatable, default: all active)")]
        repos: Vec<String>,

        #[arg(long, help = "Only count commits whose author name contains this")]
        author: Option<String>,

        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Output as NDJSON", conflicts_with = "json")]
        ndjson: bool,
    },
    /// Commits made today
    Today {
        #[arg(long = "repo", help = "Repository id (repeatable, default: all active)")]
        repos: Vec<String>,

        #[arg(long, help = "Only show commits whose author name contains this")]
        author: Option<String>,

        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    /// Commits made on one local calendar day
    Day {
        #[arg(help = "Date (YYYY-MM-DD, yesterday, 3 days ago, ...)")]
        date: String,

        #[arg(long = "repo", help = "Repository id (repeatable, default: all active)")]
        repos: Vec<String>,

        #[arg(long, help = "Only show commits whose author name contains this")]
        author: Option<String>,

        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    /// Delete stored commits older than a cutoff
    Prune {
        #[arg(long, help = "Cutoff date or duration (e.g. 90d, 2024-01-01)")]
        older_than: String,
    },
    /// Delete all stored commits of a repository
    Forget {
        #[arg(help = "Repository id")]
        id: String,
    },
}

#[derive(Subcommand)]
pub enum RepoCommands {
    /// List registered repositories
    List {
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    /// Register a single repository
    Add {
        #[arg(help = "Path to a git working tree")]
        path: PathBuf,
    },
    /// Include a repository in imports and heat maps
    Enable { id: String },
    /// Exclude a repository from imports and heat maps
    Disable { id: String },
    /// Unregister a repository and delete its commits
    Remove { id: String },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub async fn execute(self) -> Result<()> {
        let common = self.common;
        match self.command {
            Commands::Scan { base, no_remote, json } => {
                crate::repos::exec_scan(common, base, no_remote, json).await
            }
            Commands::Repos { command } => match command {
                RepoCommands::List { json } => crate::repos::exec_list(common, json),
                RepoCommands::Add { path } => crate::repos::exec_add(common, path).await,
                RepoCommands::Enable { id } => crate::repos::exec_set_active(common, id, true),
                RepoCommands::Disable { id } => crate::repos::exec_set_active(common, id, false),
                RepoCommands::Remove { id } => crate::repos::exec_remove(common, id),
            },
            Commands::Import { repos, authors, since, until, keep, json } => {
                crate::import::exec(common, repos, authors, since, until, keep, json).await
            }
            Commands::Heat { days, repos, author, json, ndjson } => {
                crate::heat::exec_heat(common, days, repos, author, json, ndjson).await
            }
            Commands::Today { repos, author, json } => {
                crate::heat::exec_today(common, repos, author, json).await
            }
            Commands::Day { date, repos, author, json } => {
                crate::heat::exec_day(common, date, repos, author, json).await
            }
            Commands::Prune { older_than } => crate::repos::exec_prune(common, older_than),
            Commands::Forget { id } => crate::repos::exec_forget(common, id),
        }
    }
}
