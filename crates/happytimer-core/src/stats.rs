//! Views over the session log: tag grouping and focus totals.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, Local, NaiveTime, TimeZone};
use serde::Serialize;

use crate::interval::IntervalType;
use crate::storage::SessionRecord;

pub const UNTAGGED_LABEL: &str = "Untagged";

/// Sessions sharing one tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagGroup {
    pub label: String,
    pub count: usize,
    pub total_seconds: i64,
    /// Newest first.
    pub sessions: Vec<SessionRecord>,
}

/// Group sessions by trimmed tag, labels sorted, each group newest first.
pub fn group_by_tag(sessions: &[SessionRecord]) -> Vec<TagGroup> {
    let mut groups: BTreeMap<String, Vec<SessionRecord>> = BTreeMap::new();
    for session in sessions {
        let tag = session.tag.trim();
        let label = if tag.is_empty() { UNTAGGED_LABEL } else { tag };
        groups.entry(label.to_string()).or_default().push(session.clone());
    }

    groups
        .into_iter()
        .map(|(label, mut sessions)| {
            sessions.sort_by(|a, b| b.ended_at.cmp(&a.ended_at));
            TagGroup {
                count: sessions.len(),
                total_seconds: sessions.iter().map(|s| s.duration_seconds).sum(),
                label,
                sessions,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total_sessions: usize,
    pub focus_sessions: usize,
    pub focus_seconds: i64,
    pub break_seconds: i64,
    pub today_focus_sessions: usize,
    pub today_focus_seconds: i64,
    pub week_focus_sessions: usize,
    pub week_focus_seconds: i64,
}

impl SessionStats {
    /// Totals as of `now` (epoch seconds). Days and weeks (starting Monday)
    /// follow the local time zone; a session belongs to the day it ended.
    pub fn from_sessions(sessions: &[SessionRecord], now: i64) -> Self {
        let (today_start, week_start) = day_and_week_start(now);
        let mut stats = SessionStats {
            total_sessions: sessions.len(),
            ..SessionStats::default()
        };

        for session in sessions {
            if session.kind() != Some(IntervalType::Focus) {
                stats.break_seconds += session.duration_seconds;
                continue;
            }
            stats.focus_sessions += 1;
            stats.focus_seconds += session.duration_seconds;
            if session.ended_at >= week_start {
                stats.week_focus_sessions += 1;
                stats.week_focus_seconds += session.duration_seconds;
            }
            if session.ended_at >= today_start {
                stats.today_focus_sessions += 1;
                stats.today_focus_seconds += session.duration_seconds;
            }
        }
        stats
    }
}

fn day_and_week_start(now: i64) -> (i64, i64) {
    let local: DateTime<Local> = match Local.timestamp_opt(now, 0).earliest() {
        Some(dt) => dt,
        None => return (now, now),
    };
    let today = local.date_naive();
    let week = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    let start_of = |date: chrono::NaiveDate| {
        Local
            .from_local_datetime(&date.and_time(NaiveTime::MIN))
            .earliest()
            .map(|dt| dt.timestamp())
            .unwrap_or(now)
    };
    (start_of(today), start_of(week))
}
