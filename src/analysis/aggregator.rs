//! Statistics aggregation over store snapshots.
//!
//! Every function here is pure: it reads the collections it is given and
//! returns freshly built values, so repeated calls on the same snapshot
//! produce identical output.

use crate::models::{
    parse_timestamp, Collection, ContributorSummary, Entry, EntryBreakdown, EntryKind,
    EntryRecord, MergedEntries, StatsSummary, UserPlaytime, UserRecord, UserSummary,
};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::HashMap;

/// Length of the trailing window used for recent signups.
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// Default size of the contributor ranking.
pub const TOP_CONTRIBUTORS_LIMIT: usize = 10;

/// How many contributors the compact chart shows.
pub const COMPACT_CHART_LIMIT: usize = 5;

/// How many entries the recent-entries table shows.
pub const RECENT_ENTRIES_SHOWN: usize = 10;

/// Group label for entries without a creator name.
pub const UNKNOWN_CONTRIBUTOR: &str = "Unknown";

/// Count the top-level keys of a collection.
pub fn count<T>(collection: &Collection<T>) -> usize {
    collection.len()
}

/// Start of the recent-signup window ending at `now`.
pub fn recent_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(RECENT_WINDOW_DAYS)
}

/// Count users created strictly after `window_start`.
///
/// Users without a readable `createdAt` are never recent.
pub fn count_recent(users: &Collection<UserRecord>, window_start: DateTime<Utc>) -> usize {
    users
        .values()
        .filter(|user| user.created_at().is_some_and(|t| t > window_start))
        .count()
}

/// Sum of one user's `playtime.total` values, in seconds.
pub fn user_playtime(user: &UserRecord) -> f64 {
    let total = user.playtime.as_ref().and_then(|p| p.get("total"));

    match total {
        Some(Value::Object(sessions)) => sessions.values().map(coerce_seconds).sum(),
        Some(Value::Array(sessions)) => sessions.iter().map(coerce_seconds).sum(),
        _ => 0.0,
    }
}

/// Sum playtime across all users, in seconds.
pub fn sum_playtime(users: &Collection<UserRecord>) -> f64 {
    users.values().map(user_playtime).sum()
}

/// Coerce a stored playtime value to seconds; anything non-numeric is 0.
pub fn coerce_seconds(value: &Value) -> f64 {
    let seconds = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse::<f64>().unwrap_or(0.0)
            }
        }
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };

    if seconds.is_finite() {
        seconds
    } else {
        0.0
    }
}

/// Format seconds as `"{h}h {m}m"`, or `"{m}m"` below one hour.
///
/// Leftover seconds are truncated. Negative or non-finite input reads as 0.
pub fn format_duration(total_seconds: f64) -> String {
    let seconds = if total_seconds.is_finite() && total_seconds > 0.0 {
        total_seconds.floor() as u64
    } else {
        0
    };

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Sort key for newest-first ordering; missing or unreadable is the epoch.
fn created_millis(created_at: Option<&Value>) -> i64 {
    created_at
        .and_then(parse_timestamp)
        .map(|t| t.timestamp_millis())
        .unwrap_or(0)
}

/// Merge games and websites into one newest-first list.
///
/// Games are placed before websites ahead of the stable sort, so entries
/// with equal timestamps keep that order.
pub fn merge_entries(
    games: &Collection<EntryRecord>,
    websites: &Collection<EntryRecord>,
) -> MergedEntries {
    let mut entries: Vec<Entry> = games
        .iter()
        .map(|(id, record)| Entry::annotate(id, EntryKind::Game, record))
        .chain(
            websites
                .iter()
                .map(|(id, record)| Entry::annotate(id, EntryKind::Website, record)),
        )
        .collect();

    entries.sort_by_key(|entry| Reverse(created_millis(entry.record.created_at.as_ref())));

    MergedEntries {
        entries,
        breakdown: EntryBreakdown {
            games: count(games),
            websites: count(websites),
        },
    }
}

/// Rank creators by number of entries across both collections.
///
/// Ties keep the order in which each username was first seen.
pub fn rank_contributors(
    games: &Collection<EntryRecord>,
    websites: &Collection<EntryRecord>,
    limit: usize,
) -> Vec<ContributorSummary> {
    let mut ranking: Vec<ContributorSummary> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for record in games.values().chain(websites.values()) {
        let username = record
            .username
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_CONTRIBUTOR);

        match positions.get(username) {
            Some(&position) => ranking[position].entry_count += 1,
            None => {
                positions.insert(username, ranking.len());
                ranking.push(ContributorSummary {
                    username: username.to_string(),
                    entry_count: 1,
                });
            }
        }
    }

    ranking.sort_by_key(|contributor| Reverse(contributor.entry_count));
    ranking.truncate(limit);
    ranking
}

/// List users newest first.
pub fn list_users(users: &Collection<UserRecord>) -> Vec<UserSummary> {
    let mut summaries: Vec<UserSummary> = users
        .iter()
        .map(|(uid, user)| UserSummary {
            uid: uid.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at.clone(),
            last_login_at: user.last_login_at.clone(),
        })
        .collect();

    summaries.sort_by_key(|user| Reverse(created_millis(user.created_at.as_ref())));
    summaries
}

/// Per-user playtime totals, newest user first.
pub fn user_playtimes(users: &Collection<UserRecord>) -> Vec<UserPlaytime> {
    let mut playtimes: Vec<UserPlaytime> = users
        .iter()
        .map(|(uid, user)| {
            let total = user_playtime(user);
            UserPlaytime {
                uid: uid.to_string(),
                username: user.username.clone(),
                created_at: user.created_at.clone(),
                total_playtime: total,
                total_playtime_formatted: format_duration(total),
            }
        })
        .collect();

    playtimes.sort_by_key(|user| Reverse(created_millis(user.created_at.as_ref())));
    playtimes
}

/// Players with the most recorded playtime, highest first.
pub fn top_players(users: &Collection<UserRecord>, n: usize) -> Vec<UserPlaytime> {
    let mut players: Vec<UserPlaytime> = user_playtimes(users)
        .into_iter()
        .filter(|player| player.total_playtime > 0.0)
        .collect();

    players.sort_by(|a, b| {
        b.total_playtime
            .partial_cmp(&a.total_playtime)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    players.truncate(n);
    players
}

/// Compute the global statistics summary at request time `now`.
pub fn summarize(
    users: &Collection<UserRecord>,
    games: &Collection<EntryRecord>,
    websites: &Collection<EntryRecord>,
    now: DateTime<Utc>,
) -> StatsSummary {
    let total_games = count(games);
    let total_websites = count(websites);
    let total_playtime = sum_playtime(users);

    StatsSummary {
        total_users: count(users),
        recent_signups: count_recent(users, recent_window_start(now)),
        total_games,
        total_websites,
        total_entries: total_games + total_websites,
        total_playtime,
        total_playtime_formatted: format_duration(total_playtime),
    }
}
