use crate::model::{CommitEntry, DayBucket, DayBuckets, DayStats, HeatOutput};
use anyhow::Result;
use chrono::{Datelike, Days, Local, NaiveDate};
use console::style;

/// Windows up to this many days are printed as a day list instead of a grid.
const LIST_THRESHOLD_DAYS: i64 = 31;

const WEEKDAY_LABELS: [&str; 7] = ["Mon", "", "Wed", "", "Fri", "", "Sun"];

pub fn output_json(output: &HeatOutput) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(())
}

pub fn output_ndjson(buckets: &DayBuckets) -> Result<()> {
    for (day, stats) in buckets {
        let bucket = DayBucket { day: *day, stats: *stats };
        println!("{}", serde_json::to_string(&bucket)?);
    }
    Ok(())
}

pub fn output_calendar(buckets: &DayBuckets, first: NaiveDate, last: NaiveDate) -> Result<()> {
    let span = (last - first).num_days() + 1;
    if buckets.is_empty() {
        println!("No commits in the last {span} days");
        return Ok(());
    }

    let max_commits = buckets.values().map(|d| d.commit_count).max().unwrap_or(1).max(1);

    println!("{}", style("Commit Activity").bold());
    println!("{}", "─".repeat(50));

    if span <= LIST_THRESHOLD_DAYS {
        print_day_list(buckets, max_commits);
    } else {
        print_grid(buckets, first, last, max_commits);
    }

    print_totals(buckets);
    Ok(())
}

pub fn output_commits(entries: &[CommitEntry], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No commits");
        return Ok(());
    }

    for e in entries {
        println!(
            "{} {:<20} {} {:>12} {:<20} {}",
            style(e.timestamp.with_timezone(&Local).format("%H:%M")).dim(),
            e.repository,
            style(&e.short_hash).yellow(),
            format!("+{}/-{}", e.lines_added, e.lines_deleted),
            e.author_name,
            e.subject
        );
    }

    let added: u64 = entries.iter().map(|e| e.lines_added).sum();
    let deleted: u64 = entries.iter().map(|e| e.lines_deleted).sum();
    println!(
        "\n{} commits, {} / {}",
        style(entries.len()).cyan(),
        style(format!("+{added}")).green(),
        style(format!("-{deleted}")).red()
    );
    Ok(())
}

fn intensity(count: u32, max: u32) -> u32 {
    if count == 0 {
        return 0;
    }
    (((count as f64 / max as f64) * 4.0).ceil() as u32).clamp(1, 4)
}

fn cell(stats: Option<&DayStats>, max: u32) -> String {
    match intensity(stats.map(|s| s.commit_count).unwrap_or(0), max) {
        0 => style("·").dim().to_string(),
        1 => style("░").green().to_string(),
        2 => style("▒").green().to_string(),
        3 => style("▓").green().to_string(),
        _ => style("█").green().to_string(),
    }
}

fn print_day_list(buckets: &DayBuckets, max_commits: u32) {
    for (day, stats) in buckets {
        let bar = match intensity(stats.commit_count, max_commits) {
            1 => "▁",
            2 => "▃",
            3 => "▅",
            _ => "█",
        };
        println!(
            "{} {} commits: {:>3}, lines: {} {}",
            day.format("%Y-%m-%d %a"),
            style(bar).green(),
            stats.commit_count,
            style(format!("+{:<6}", stats.lines_added)).green(),
            style(format!("-{:<6}", stats.lines_deleted)).red()
        );
    }
}

fn print_grid(buckets: &DayBuckets, first: NaiveDate, last: NaiveDate, max_commits: u32) {
    let start = first
        .checked_sub_days(Days::new(u64::from(first.weekday().num_days_from_monday())))
        .unwrap_or(first);
    let weeks = ((last - start).num_days() / 7 + 1) as usize;

    let mut header = vec![' '; weeks * 2 + 4];
    let mut free_from = 0usize;
    let mut previous_month = None;
    for week in 0..weeks {
        let monday = start + Days::new(week as u64 * 7);
        let shown = if monday < first { first } else { monday };
        if previous_month != Some(shown.month()) {
            previous_month = Some(shown.month());
            let pos = week * 2;
            if pos >= free_from {
                let label = shown.format("%b").to_string();
                for (i, ch) in label.chars().enumerate() {
                    if let Some(slot) = header.get_mut(pos + i) {
                        *slot = ch;
                    }
                }
                free_from = pos + label.len() + 1;
            }
        }
    }
    println!("    {}", header.iter().collect::<String>().trim_end());

    for weekday in 0..7u64 {
        let mut row = format!("{:<4}", WEEKDAY_LABELS[weekday as usize]);
        for week in 0..weeks {
            let date = start + Days::new(week as u64 * 7 + weekday);
            if date < first || date > last {
                row.push_str("  ");
            } else {
                row.push_str(&cell(buckets.get(&date), max_commits));
                row.push(' ');
            }
        }
        println!("{}", row.trim_end());
    }

    println!(
        "\n    less {} {} {} {} {} more",
        style("·").dim(),
        style("░").green(),
        style("▒").green(),
        style("▓").green(),
        style("█").green()
    );
}

fn print_totals(buckets: &DayBuckets) {
    let commits: u32 = buckets.values().map(|d| d.commit_count).sum();
    let added: u64 = buckets.values().map(|d| d.lines_added).sum();
    let deleted: u64 = buckets.values().map(|d| d.lines_deleted).sum();

    println!();
    println!("Total commits: {}", style(commits).cyan());
    println!("Lines added: {}", style(added).green());
    println!("Lines deleted: {}", style(deleted).red());
    println!("Active days: {}", style(buckets.len()).yellow());

    if let Some((day, stats)) = buckets.iter().max_by_key(|(_, s)| s.commit_count) {
        println!(
            "Busiest day: {} ({} commits)",
            style(day.format("%Y-%m-%d")).dim(),
            stats.commit_count
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_scales_to_four_levels() {
        assert_eq!(intensity(0, 10), 0);
        assert_eq!(intensity(1, 10), 1);
        assert_eq!(intensity(5, 10), 2);
        assert_eq!(intensity(8, 10), 4);
        assert_eq!(intensity(10, 10), 4);
        assert_eq!(intensity(1, 1), 4);
    }
}
