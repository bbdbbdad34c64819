// crates/db/src/analytics.rs
//! Work-session analytics: period bucketing and duration aggregation
//! (spec.md §4.5 "Analytics engine").
//!
//! Bucket boundaries are computed the way the teacher computes its week
//! boundaries in `trends.rs` — ISO week starts at Monday 00:00 UTC — but
//! generalized here to day/week/month so a single code path serves all
//! three report granularities.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use std::collections::HashMap;
use taskboard_types::WorkSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Day,
    Week,
    Month,
}

/// Clip a session's `[started_at, ended_at)` interval to `[range_start,
/// range_end)`, returning `None` if it doesn't overlap at all. An open
/// session (`ended_at = None`) is clipped against `now`.
pub fn clip_range(
    session: &WorkSession,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let end = session.ended_at.unwrap_or(now);
    let start = session.started_at.max(range_start);
    let end = end.min(range_end);
    if start >= end {
        None
    } else {
        Some((start, end))
    }
}

/// The bucket key a timestamp falls into for a given period: an ISO date
/// for `Day`, `YYYY-Www` per the ISO-8601 week calendar for `Week`
/// (glossary "ISO week"), or `YYYY-MM` for `Month`.
pub fn period_key(at: DateTime<Utc>, period: Period) -> String {
    match period {
        Period::Day => at.date_naive().to_string(),
        Period::Week => {
            let iso = at.iso_week();
            format!("{:04}-W{:02}", iso.year(), iso.week())
        }
        Period::Month => format!("{:04}-{:02}", at.year(), at.month()),
    }
}

/// The start of the next period boundary after `at`, used to walk a range
/// bucket by bucket without re-deriving calendar math at each step.
pub fn next_boundary(at: DateTime<Utc>, period: Period) -> DateTime<Utc> {
    match period {
        Period::Day => {
            let next_date = at.date_naive() + Duration::days(1);
            Utc.from_utc_datetime(&next_date.and_hms_opt(0, 0, 0).unwrap())
        }
        Period::Week => {
            let days_since_monday = at.weekday().num_days_from_monday() as i64;
            let this_monday = at.date_naive() - Duration::days(days_since_monday);
            let next_monday = this_monday + Duration::days(7);
            Utc.from_utc_datetime(&next_monday.and_hms_opt(0, 0, 0).unwrap())
        }
        Period::Month => {
            let (y, m) = (at.year(), at.month());
            let (ny, nm) = if m == 12 { (y + 1, 1) } else { (y, m + 1) };
            Utc.with_ymd_and_hms(ny, nm, 1, 0, 0, 0).unwrap()
        }
    }
}

/// Sum the clipped, closed duration of `sessions` against `[range_start,
/// range_end)`, in whole seconds.
pub fn sum_rows_seconds(
    sessions: &[WorkSession],
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> i64 {
    sessions
        .iter()
        .filter_map(|s| clip_range(s, range_start, range_end, now))
        .map(|(a, b)| (b - a).num_seconds())
        .sum()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodTotal {
    pub key: String,
    pub seconds: i64,
}

/// Bucket every session into its period key and sum seconds per bucket,
/// walking the full session span boundary by boundary so a session that
/// straddles a period split contributes to both buckets proportionally.
pub fn aggregate_period_totals(
    sessions: &[WorkSession],
    period: Period,
    now: DateTime<Utc>,
) -> Vec<PeriodTotal> {
    let mut totals: HashMap<String, i64> = HashMap::new();
    for s in sessions {
        let end = s.ended_at.unwrap_or(now);
        let mut cursor = s.started_at;
        while cursor < end {
            let boundary = next_boundary(cursor, period).min(end);
            let key = period_key(cursor, period);
            let seconds = (boundary - cursor).num_seconds();
            *totals.entry(key).or_insert(0) += seconds;
            cursor = boundary;
        }
    }
    let mut rows: Vec<PeriodTotal> = totals
        .into_iter()
        .map(|(key, seconds)| PeriodTotal { key, seconds })
        .collect();
    rows.sort_by(|a, b| a.key.cmp(&b.key));
    rows
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectTotal {
    pub project_title: String,
    pub seconds: i64,
}

pub fn aggregate_project_totals(sessions: &[WorkSession], now: DateTime<Utc>) -> Vec<ProjectTotal> {
    let mut totals: HashMap<String, i64> = HashMap::new();
    for s in sessions {
        let end = s.ended_at.unwrap_or(now);
        let seconds = (end - s.started_at).num_seconds().max(0);
        *totals.entry(s.project_title.clone()).or_insert(0) += seconds;
    }
    let mut rows: Vec<ProjectTotal> = totals
        .into_iter()
        .map(|(project_title, seconds)| ProjectTotal { project_title, seconds })
        .collect();
    rows.sort_by(|a, b| b.seconds.cmp(&a.seconds));
    rows
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTotal {
    pub task_url: String,
    pub seconds: i64,
}

pub fn aggregate_task_totals(sessions: &[WorkSession], now: DateTime<Utc>) -> Vec<TaskTotal> {
    let mut totals: HashMap<String, i64> = HashMap::new();
    for s in sessions {
        let end = s.ended_at.unwrap_or(now);
        let seconds = (end - s.started_at).num_seconds().max(0);
        *totals.entry(s.task_url.clone()).or_insert(0) += seconds;
    }
    let mut rows: Vec<TaskTotal> = totals
        .into_iter()
        .map(|(task_url, seconds)| TaskTotal { task_url, seconds })
        .collect();
    rows.sort_by(|a, b| b.seconds.cmp(&a.seconds));
    rows
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTotal {
    pub label: String,
    pub seconds: i64,
}

/// A session carrying N labels contributes its full duration to each
/// label's bucket (labels are not mutually exclusive, so this double
/// counts by design rather than arbitrarily picking one label per row).
pub fn aggregate_label_totals(sessions: &[WorkSession], now: DateTime<Utc>) -> Vec<LabelTotal> {
    let mut totals: HashMap<String, i64> = HashMap::new();
    for s in sessions {
        let end = s.ended_at.unwrap_or(now);
        let seconds = (end - s.started_at).num_seconds().max(0);
        for label in &s.labels {
            *totals.entry(label.clone()).or_insert(0) += seconds;
        }
    }
    let mut rows: Vec<LabelTotal> = totals
        .into_iter()
        .map(|(label, seconds)| LabelTotal { label, seconds })
        .collect();
    rows.sort_by(|a, b| b.seconds.cmp(&a.seconds));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session(started: DateTime<Utc>, ended: Option<DateTime<Utc>>) -> WorkSession {
        WorkSession {
            id: 1,
            task_url: "https://example/1".into(),
            project_title: "Roadmap".into(),
            labels: vec!["bug".into()],
            started_at: started,
            ended_at: ended,
        }
    }

    #[test]
    fn period_key_week_uses_iso_week_number() {
        let tuesday = Utc.with_ymd_and_hms(2026, 1, 6, 12, 0, 0).unwrap();
        assert_eq!(period_key(tuesday, Period::Week), "2026-W02");
    }

    #[test]
    fn period_key_week_agrees_across_the_same_iso_week() {
        let monday = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        let sunday = Utc.with_ymd_and_hms(2026, 1, 11, 23, 59, 0).unwrap();
        assert_eq!(period_key(monday, Period::Week), period_key(sunday, Period::Week));
    }

    #[test]
    fn sum_rows_seconds_clips_to_range() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 23, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 1, 2, 1, 0, 0).unwrap();
        let s = session(start, Some(end));
        let range_start = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        let range_end = Utc.with_ymd_and_hms(2026, 1, 3, 0, 0, 0).unwrap();
        let seconds = sum_rows_seconds(&[s], range_start, range_end, end);
        assert_eq!(seconds, 3600);
    }

    #[test]
    fn aggregate_period_totals_splits_across_day_boundary() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 23, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 1, 2, 1, 0, 0).unwrap();
        let s = session(start, Some(end));
        let totals = aggregate_period_totals(&[s], Period::Day, end);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].key, "2026-01-01");
        assert_eq!(totals[0].seconds, 3600);
        assert_eq!(totals[1].key, "2026-01-02");
        assert_eq!(totals[1].seconds, 3600);
    }

    #[test]
    fn aggregate_project_totals_sums_by_project() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        let s1 = session(now - Duration::hours(2), Some(now - Duration::hours(1)));
        let s2 = session(now - Duration::hours(1), Some(now));
        let totals = aggregate_project_totals(&[s1, s2], now);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].project_title, "Roadmap");
        assert_eq!(totals[0].seconds, 7200);
    }
}
