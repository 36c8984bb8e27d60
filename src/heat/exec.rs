use super::{output_calendar, output_commits, output_json, output_ndjson, HeatQuery};
use crate::cache::HeatView;
use crate::cli::CommonArgs;
use crate::config::{Config, MAX_WINDOW_DAYS};
use crate::model::{DayBucket, HeatOutput, SCHEMA_VERSION};
use crate::store::Store;
use crate::util::{local_day, parse_date, trailing_days};
use anyhow::Context;
use chrono::{Local, NaiveDate, Utc};

fn open_view(common: &CommonArgs) -> anyhow::Result<(Config, HeatView)> {
    let config = common.config()?;
    let store = Store::open(&config.database).context("Failed to open database")?;
    Ok((config, HeatView::new(store)))
}

/// A single configured author doubles as the default display filter.
fn default_author(config: &Config, author: Option<String>) -> Option<String> {
    author.or_else(|| match config.authors.as_slice() {
        [only] => Some(only.clone()),
        _ => None,
    })
}

pub async fn exec_heat(
    common: CommonArgs,
    days: Option<u32>,
    repos: Vec<String>,
    author: Option<String>,
    json: bool,
    ndjson: bool,
) -> anyhow::Result<()> {
    let (config, mut view) = open_view(&common)?;
    // the config file is not range checked by clap
    let window_days = days.unwrap_or(config.heat.window_days).min(MAX_WINDOW_DAYS);
    let query = HeatQuery::new(window_days)
        .repositories(repos)
        .author(default_author(&config, author));

    let buckets = view
        .load(query.clone())
        .await
        .context("Failed to compute daily statistics")?
        .clone();

    if json {
        let output = HeatOutput {
            version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            window_days,
            repositories: query.repository_ids.clone(),
            author: query.author.clone(),
            days: buckets
                .iter()
                .map(|(day, stats)| DayBucket { day: *day, stats: *stats })
                .collect(),
        };
        return output_json(&output);
    }
    if ndjson {
        return output_ndjson(&buckets);
    }

    let now = Utc::now();
    let today = local_day(&now, &Local);
    let first = trailing_days(&now, window_days.max(1), &Local)
        .since
        .map(|s| local_day(&s, &Local))
        .unwrap_or(today);
    output_calendar(&buckets, first, today)
}

pub async fn exec_today(
    common: CommonArgs,
    repos: Vec<String>,
    author: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let (config, mut view) = open_view(&common)?;
    let query = HeatQuery::default()
        .repositories(repos)
        .author(default_author(&config, author));

    let entries = view.today(query).await.context("Failed to load commits")?;
    if !json {
        println!("{}", console::style("Today").bold());
    }
    output_commits(&entries, json)
}

pub async fn exec_day(
    common: CommonArgs,
    date: String,
    repos: Vec<String>,
    author: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let at = parse_date(&date, &Utc::now(), &Local).context("Failed to parse date")?;
    let date = local_day(&at, &Local);
    show_day(common, date, repos, author, json).await
}

async fn show_day(
    common: CommonArgs,
    date: NaiveDate,
    repos: Vec<String>,
    author: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let (config, mut view) = open_view(&common)?;
    let query = HeatQuery::default()
        .repositories(repos)
        .author(default_author(&config, author));

    let entries = view
        .day_details(date, query)
        .await
        .context("Failed to load commits")?;

    if !json {
        println!("{}", console::style(date.format("%A, %Y-%m-%d")).bold());
    }
    output_commits(&entries, json)
}
