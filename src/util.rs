use crate::error::{PulseError, Result};
use crate::model::DateRange;
use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use std::time::Duration;

/// Calendar day of `timestamp` as seen in `tz`.
pub fn local_day<Tz: TimeZone>(timestamp: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    timestamp.with_timezone(tz).date_naive()
}

/// First instant of `date` in `tz`. Midnights skipped by a DST jump resolve to
/// the first hour that exists.
pub fn day_start<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + TimeDelta::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

pub fn day_range<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateRange {
    let next = date.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
    DateRange::between(day_start(date, tz), day_start(next, tz))
}

/// The last `days` local calendar days ending with the day containing `now`.
pub fn trailing_days<Tz: TimeZone>(now: &DateTime<Utc>, days: u32, tz: &Tz) -> DateRange {
    let today = local_day(now, tz);
    let end = day_start(today.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX), tz);
    if days == 0 {
        return DateRange::between(end, end);
    }
    let first = today
        .checked_sub_days(Days::new(u64::from(days - 1)))
        .unwrap_or(NaiveDate::MIN);
    DateRange::between(day_start(first, tz), end)
}

/// Parses user supplied dates: `now`, `today`, `yesterday`, RFC 3339,
/// `YYYY-MM-DD` (start of that local day), `N days|weeks|months ago`, or a humantime duration before `now`.
pub fn parse_date<Tz: TimeZone>(input: &str, now: &DateTime<Utc>, tz: &Tz) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();

    if trimmed.eq_ignore_ascii_case("now") {
        return Ok(*now);
    }
    if trimmed.eq_ignore_ascii_case("today") {
        return Ok(day_start(local_day(now, tz), tz));
    }
    if trimmed.eq_ignore_ascii_case("yesterday") {
        let today = local_day(now, tz);
        return Ok(day_start(today.pred_opt().unwrap_or(today), tz));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(day_start(date, tz));
    }

    let duration = parse_natural_duration(trimmed)
        .or_else(|| humantime::parse_duration(trimmed).ok())
        .ok_or_else(|| PulseError::InvalidDate(format!("Unrecognised date '{input}'")))?;
    let delta = TimeDelta::from_std(duration)
        .map_err(|_| PulseError::InvalidDate(format!("Duration overflow for '{input}'")))?;
    now.checked_sub_signed(delta)
        .ok_or_else(|| PulseError::InvalidDate(format!("Duration overflow for '{input}'")))
}

/// Resolves optional `since`/`until` inputs into a validated range.
pub fn resolve_range<Tz: TimeZone>(
    since: Option<&str>,
    until: Option<&str>,
    now: &DateTime<Utc>,
    tz: &Tz,
) -> Result<DateRange> {
    let mut range = DateRange::new();
    if let Some(s) = since {
        range = range.with_since(parse_date(s, now, tz)?);
    }
    if let Some(u) = until {
        range = range.with_until(parse_date(u, now, tz)?);
    }
    if range.is_empty() {
        return Err(PulseError::InvalidDate(format!(
            "Invalid range: since ({}) is not before until ({})",
            since.unwrap_or_default(),
            until.unwrap_or_default()
        )));
    }
    Ok(range)
}

fn parse_natural_duration(input: &str) -> Option<Duration> {
    let input = input.to_lowercase();
    let units = [(" days ago", 1u64), (" weeks ago", 7), (" months ago", 30)];

    for (suffix, days) in units {
        if let Some(n) = input.strip_suffix(suffix) {
            if let Ok(n) = n.trim().parse::<u64>() {
                return n
                    .checked_mul(days)?
                    .checked_mul(86400)
                    .map(Duration::from_secs);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use pretty_assertions::assert_eq;

    fn plus_two() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    #[test]
    fn local_day_respects_offset() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 31, 23, 30, 0).unwrap();
        assert_eq!(local_day(&ts, &Utc), NaiveDate::from_ymd_opt(2024, 5, 31).unwrap());
        assert_eq!(local_day(&ts, &plus_two()), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }

    #[test]
    fn trailing_window_covers_whole_days() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 15, 0, 0).unwrap();
        let range = trailing_days(&now, 3, &Utc);
        assert_eq!(range.since, Some(Utc.with_ymd_and_hms(2024, 6, 8, 0, 0, 0).unwrap()));
        assert_eq!(range.until, Some(Utc.with_ymd_and_hms(2024, 6, 11, 0, 0, 0).unwrap()));

        let zero = trailing_days(&now, 0, &Utc);
        assert!(zero.is_empty());
    }

    #[test]
    fn parses_supported_date_forms() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 15, 0, 0).unwrap();
        let tz = plus_two();

        assert_eq!(
            parse_date("2024-06-01", &now, &tz).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 31, 22, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date("2024-06-01T10:00:00+00:00", &now, &tz).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date("2 days ago", &now, &tz).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 8, 15, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date("1week", &now, &tz).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 3, 15, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date("yesterday", &now, &Utc).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 9, 0, 0, 0).unwrap()
        );
        assert!(parse_date("someday", &now, &tz).is_err());
        assert!(matches!(
            parse_date("99999999999999999 days ago", &now, &tz),
            Err(PulseError::InvalidDate(_))
        ));
        assert!(matches!(
            parse_date("100000000 weeks ago", &now, &tz),
            Err(PulseError::InvalidDate(_))
        ));
    }

    #[test]
    fn rejects_inverted_range() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 15, 0, 0).unwrap();
        assert!(resolve_range(Some("2024-06-05"), Some("2024-06-01"), &now, &Utc).is_err());
        let open = resolve_range(Some("2024-06-01"), None, &now, &Utc).unwrap();
        assert!(open.until.is_none());
    }
}
