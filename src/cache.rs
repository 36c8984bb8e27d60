use crate::error::{PulseError, Result};
use crate::heat::{Aggregator, CancelFlag, HeatQuery};
use crate::model::{Commit, CommitEntry, DayBuckets, Repository};
use crate::store::Store;
use chrono::{Local, NaiveDate, Utc};
use std::collections::HashMap;

/// Id to repository lookup, rebuilt from the store on every load.
#[derive(Debug, Clone, Default)]
pub struct RepositoryCache {
    by_id: HashMap<String, Repository>,
}

impl RepositoryCache {
    pub fn load(store: &Store) -> Result<Self> {
        let by_id = store
            .list_repositories()?
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();
        Ok(Self { by_id })
    }

    pub fn get(&self, id: &str) -> Option<&Repository> {
        self.by_id.get(id)
    }

    /// Display name for `id`, falling back to the id itself.
    pub fn name<'a>(&'a self, id: &'a str) -> &'a str {
        self.by_id.get(id).map(|r| r.name.as_str()).unwrap_or(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn entry(&self, commit: &Commit) -> CommitEntry {
        CommitEntry {
            hash: commit.hash.clone(),
            short_hash: commit.short_hash().to_string(),
            repository: self.name(&commit.repository_id).to_string(),
            author_name: commit.author_name.clone(),
            author_email: commit.author_email.clone(),
            timestamp: commit.timestamp,
            subject: commit.subject().to_string(),
            lines_added: commit.lines_added,
            lines_deleted: commit.lines_deleted,
        }
    }
}

/// Heat-map state owned by whoever displays it. Loads run on the blocking
/// pool; once [`HeatView::cancel`] is called no load writes into the view.
pub struct HeatView {
    store: Store,
    cancel: CancelFlag,
    repositories: RepositoryCache,
    buckets: DayBuckets,
}

impl HeatView {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            cancel: CancelFlag::default(),
            repositories: RepositoryCache::default(),
            buckets: DayBuckets::new(),
        }
    }

    pub fn cancel_handle(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn buckets(&self) -> &DayBuckets {
        &self.buckets
    }

    pub fn repositories(&self) -> &RepositoryCache {
        &self.repositories
    }

    pub async fn load(&mut self, query: HeatQuery) -> Result<&DayBuckets> {
        let store = self.store.clone();
        let cancel = self.cancel.clone();

        let (repositories, buckets) = tokio::task::spawn_blocking(move || {
            let repositories = RepositoryCache::load(&store)?;
            let buckets = Aggregator::new(&store, Local)
                .with_cancel(cancel)
                .daily(&query, &Utc::now())?;
            Ok::<_, PulseError>((repositories, buckets))
        })
        .await
        .map_err(|e| PulseError::Other(format!("heat load task failed: {e}")))??;

        if self.cancel.is_cancelled() {
            return Err(PulseError::Cancelled);
        }
        self.repositories = repositories;
        self.buckets = buckets;
        Ok(&self.buckets)
    }

    /// Commits behind one day of the heat-map, newest first.
    pub async fn day_details(&mut self, date: NaiveDate, query: HeatQuery) -> Result<Vec<CommitEntry>> {
        self.commit_entries(query, move |aggregator, query| aggregator.on_date(date, query))
            .await
    }

    /// Commits of the current local day across the selected repositories.
    pub async fn today(&mut self, query: HeatQuery) -> Result<Vec<CommitEntry>> {
        self.commit_entries(query, |aggregator, query| aggregator.today(query, &Utc::now()))
            .await
    }

    async fn commit_entries<F>(&mut self, query: HeatQuery, read: F) -> Result<Vec<CommitEntry>>
    where
        F: FnOnce(&Aggregator<'_, Local>, &HeatQuery) -> Result<Vec<Commit>> + Send + 'static,
    {
        let store = self.store.clone();
        let cancel = self.cancel.clone();

        let (repositories, commits) = tokio::task::spawn_blocking(move || {
            let repositories = RepositoryCache::load(&store)?;
            let aggregator = Aggregator::new(&store, Local).with_cancel(cancel);
            let commits = read(&aggregator, &query)?;
            Ok::<_, PulseError>((repositories, commits))
        })
        .await
        .map_err(|e| PulseError::Other(format!("commit list task failed: {e}")))??;

        if self.cancel.is_cancelled() {
            return Err(PulseError::Cancelled);
        }
        self.repositories = repositories;
        Ok(commits.iter().map(|c| self.repositories.entry(c)).collect())
    }
}
