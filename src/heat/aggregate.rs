use super::CancelFlag;
use crate::error::{PulseError, Result};
use crate::model::{Commit, DateRange, DayBuckets};
use crate::store::Store;
use crate::util::{day_range, local_day, trailing_days};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Selection shared by the daily, today and single-day views.
#[derive(Debug, Clone, Default)]
pub struct HeatQuery {
    /// Empty means every active repository.
    pub repository_ids: Vec<String>,
    pub window_days: u32,
    /// Case-sensitive substring of the author name.
    pub author: Option<String>,
}

impl HeatQuery {
    pub fn new(window_days: u32) -> Self {
        Self {
            window_days,
            ..Self::default()
        }
    }

    pub fn repositories(mut self, ids: Vec<String>) -> Self {
        self.repository_ids = ids;
        self
    }

    pub fn author(mut self, author: Option<String>) -> Self {
        self.author = author.filter(|a| !a.is_empty());
        self
    }
}

/// Reads stored commits and groups them by local calendar day in `tz`.
pub struct Aggregator<'a, Tz: TimeZone> {
    store: &'a Store,
    tz: Tz,
    cancel: CancelFlag,
}

impl<'a, Tz: TimeZone> Aggregator<'a, Tz> {
    pub fn new(store: &'a Store, tz: Tz) -> Self {
        Self {
            store,
            tz,
            cancel: CancelFlag::default(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Day buckets for the trailing `window_days` ending today.
    pub fn daily(&self, query: &HeatQuery, now: &DateTime<Utc>) -> Result<DayBuckets> {
        let range = trailing_days(now, query.window_days, &self.tz);
        let mut buckets = DayBuckets::new();
        if range.is_empty() {
            return Ok(buckets);
        }

        for commit in self.collect(query, &range)? {
            buckets
                .entry(local_day(&commit.timestamp, &self.tz))
                .or_default()
                .add(&commit);
        }
        Ok(buckets)
    }

    /// All matching commits of the current local day, newest first.
    pub fn today(&self, query: &HeatQuery, now: &DateTime<Utc>) -> Result<Vec<Commit>> {
        self.on_date(local_day(now, &self.tz), query)
    }

    /// All matching commits of `date`, newest first.
    pub fn on_date(&self, date: NaiveDate, query: &HeatQuery) -> Result<Vec<Commit>> {
        let mut commits = self.collect(query, &day_range(date, &self.tz))?;
        commits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(commits)
    }

    fn collect(&self, query: &HeatQuery, range: &DateRange) -> Result<Vec<Commit>> {
        let repository_ids = if query.repository_ids.is_empty() {
            self.store
                .active_repositories()?
                .into_iter()
                .map(|r| r.id)
                .collect()
        } else {
            query.repository_ids.clone()
        };

        let author = query.author.as_deref().filter(|a| !a.is_empty());
        let mut commits = Vec::new();

        for repository_id in &repository_ids {
            if self.cancel.is_cancelled() {
                return Err(PulseError::Cancelled);
            }
            let rows = self.store.commits_in_range(repository_id, range)?;
            commits.extend(
                rows.into_iter()
                    .filter(|c| author.map_or(true, |a| c.author_name.contains(a))),
            );
        }

        Ok(commits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DayStats, NewCommit, Repository};
    use chrono::FixedOffset;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn setup() -> (Store, Repository, Repository) {
        let store = Store::open_in_memory().unwrap();
        let a = Repository::new("alpha".into(), PathBuf::from("/src/alpha"), None);
        let b = Repository::new("beta".into(), PathBuf::from("/src/beta"), None);
        store.insert_repository(&a).unwrap();
        store.insert_repository(&b).unwrap();
        (store, a, b)
    }

    fn commit(hash: &str, repo: &Repository, author: &str, ts: DateTime<Utc>, added: u64) -> NewCommit {
        NewCommit {
            hash: hash.into(),
            author_name: author.into(),
            author_email: format!("{}@example.com", author.to_lowercase()),
            timestamp: ts,
            message: hash.into(),
            repository_id: repo.id.clone(),
            lines_added: added,
            lines_deleted: 1,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    #[test]
    fn empty_store_yields_empty_buckets() {
        let (store, _, _) = setup();
        let buckets = Aggregator::new(&store, Utc)
            .daily(&HeatQuery::new(30), &at(10, 12))
            .unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn buckets_by_day_across_active_repositories() {
        let (store, a, b) = setup();
        store
            .insert_commits(&[
                commit("a1", &a, "Ada", at(9, 9), 10),
                commit("a2", &a, "Ada", at(9, 18), 5),
                commit("b1", &b, "Grace", at(10, 8), 2),
                commit("old", &a, "Ada", at(1, 8), 100),
            ])
            .unwrap();

        let buckets = Aggregator::new(&store, Utc)
            .daily(&HeatQuery::new(3), &at(10, 12))
            .unwrap();

        assert_eq!(buckets.len(), 2);
        assert_eq!(
            buckets[&date(9)],
            DayStats { commit_count: 2, lines_added: 15, lines_deleted: 2 }
        );
        assert_eq!(
            buckets[&date(10)],
            DayStats { commit_count: 1, lines_added: 2, lines_deleted: 1 }
        );
    }

    #[test]
    fn author_filter_and_repository_scope() {
        let (store, a, b) = setup();
        store
            .insert_commits(&[
                commit("a1", &a, "Ada Lovelace", at(9, 9), 1),
                commit("a2", &a, "Grace", at(9, 10), 1),
                commit("b1", &b, "Ada Lovelace", at(9, 11), 1),
            ])
            .unwrap();
        let agg = Aggregator::new(&store, Utc);

        let by_author = agg
            .daily(&HeatQuery::new(7).author(Some("Ada".into())), &at(10, 0))
            .unwrap();
        assert_eq!(by_author[&date(9)].commit_count, 2);

        let lower = agg
            .daily(&HeatQuery::new(7).author(Some("ada".into())), &at(10, 0))
            .unwrap();
        assert!(lower.is_empty());

        let scoped = agg
            .daily(&HeatQuery::new(7).repositories(vec![b.id.clone()]), &at(10, 0))
            .unwrap();
        assert_eq!(scoped[&date(9)].commit_count, 1);
    }

    #[test]
    fn inactive_repositories_are_skipped_by_default() {
        let (store, a, b) = setup();
        store
            .insert_commits(&[commit("a1", &a, "Ada", at(9, 9), 1), commit("b1", &b, "Ada", at(9, 9), 1)])
            .unwrap();
        store.set_repository_active(&b.id, false).unwrap();

        let buckets = Aggregator::new(&store, Utc)
            .daily(&HeatQuery::new(7), &at(10, 0))
            .unwrap();
        assert_eq!(buckets[&date(9)].commit_count, 1);
    }

    #[test]
    fn days_follow_the_given_offset() {
        let (store, a, _) = setup();
        store
            .insert_commits(&[commit("late", &a, "Ada", at(9, 23), 1)])
            .unwrap();
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();

        let buckets = Aggregator::new(&store, plus_two)
            .daily(&HeatQuery::new(7), &at(10, 12))
            .unwrap();
        assert!(buckets.contains_key(&date(10)));
        assert!(!buckets.contains_key(&date(9)));
    }

    #[test]
    fn today_and_single_day_are_newest_first() {
        let (store, a, b) = setup();
        store
            .insert_commits(&[
                commit("early", &a, "Ada", at(10, 8), 1),
                commit("late", &b, "Ada", at(10, 17), 1),
                commit("mid", &a, "Ada", at(10, 12), 1),
                commit("yesterday", &a, "Ada", at(9, 12), 1),
            ])
            .unwrap();
        let agg = Aggregator::new(&store, Utc);

        let today: Vec<_> = agg
            .today(&HeatQuery::default(), &at(10, 20))
            .unwrap()
            .into_iter()
            .map(|c| c.hash)
            .collect();
        assert_eq!(today, vec!["late", "mid", "early"]);

        let day = agg.on_date(date(9), &HeatQuery::default()).unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].hash, "yesterday");
    }

    #[test]
    fn cancelled_aggregation_stops() {
        let (store, a, _) = setup();
        store.insert_commits(&[commit("a1", &a, "Ada", at(9, 9), 1)]).unwrap();
        let cancel = CancelFlag::default();
        cancel.cancel();

        let result = Aggregator::new(&store, Utc)
            .with_cancel(cancel)
            .daily(&HeatQuery::new(7), &at(10, 0));
        assert!(matches!(result, Err(PulseError::Cancelled)));
    }
}
