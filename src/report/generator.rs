//! Markdown and JSON report generation.
//!
//! This module renders a one-shot statistics report built from a single
//! snapshot of the store.

use crate::analysis::{self, COMPACT_CHART_LIMIT, RECENT_ENTRIES_SHOWN};
use crate::models::{
    ContributorSummary, Entry, Report, ReportMetadata, StatsSummary, UserPlaytime,
};
use crate::store::Snapshot;
use anyhow::Result;
use chrono::{DateTime, Utc};

/// How many players the playtime leaderboard lists.
const TOP_PLAYERS_SHOWN: usize = 5;

/// Build a report from one snapshot.
pub fn build_report(
    snapshot: &Snapshot,
    metadata: ReportMetadata,
    contributors_limit: usize,
) -> Report {
    let merged = analysis::merge_entries(&snapshot.games, &snapshot.websites);

    Report {
        stats: analysis::summarize(
            &snapshot.users,
            &snapshot.games,
            &snapshot.websites,
            metadata.generated_at,
        ),
        top_contributors: analysis::rank_contributors(
            &snapshot.games,
            &snapshot.websites,
            contributors_limit,
        ),
        recent_entries: merged.entries.into_iter().take(RECENT_ENTRIES_SHOWN).collect(),
        top_players: analysis::top_players(&snapshot.users, TOP_PLAYERS_SHOWN),
        metadata,
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# Statboard Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&report.stats));
    output.push_str(&generate_distribution_section(&report.stats));
    output.push_str(&generate_contributors_section(&report.top_contributors));
    output.push_str(&generate_players_section(&report.top_players));
    output.push_str(&generate_entries_section(&report.recent_entries));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Read Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the headline numbers.
fn generate_summary_section(stats: &StatsSummary) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Users | New This Week | Games | Websites | Entries | Playtime |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | **{}** | {} |\n\n",
        stats.total_users,
        stats.recent_signups,
        stats.total_games,
        stats.total_websites,
        stats.total_entries,
        stats.total_playtime_formatted
    ));

    section
}

/// Share of games vs websites.
fn generate_distribution_section(stats: &StatsSummary) -> String {
    if stats.total_entries == 0 {
        return String::new();
    }

    let mut section = String::new();
    let share = |count: usize| count as f64 / stats.total_entries as f64 * 100.0;

    section.push_str("## Entry Distribution\n\n");
    section.push_str("| Type | Entries | Share |\n");
    section.push_str("|:---|:---:|:---:|\n");
    section.push_str(&format!(
        "| Games | {} | {:.1}% |\n",
        stats.total_games,
        share(stats.total_games)
    ));
    section.push_str(&format!(
        "| Websites | {} | {:.1}% |\n\n",
        stats.total_websites,
        share(stats.total_websites)
    ));

    section
}

fn generate_contributors_section(contributors: &[ContributorSummary]) -> String {
    if contributors.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Top Contributors\n\n");
    section.push_str("| Rank | User | Entries |\n");
    section.push_str("|:---:|:---|:---:|\n");

    for (i, contributor) in contributors.iter().enumerate() {
        // The dashboard chart only shows the leading few
        let marker = if i < COMPACT_CHART_LIMIT { "📊 " } else { "" };
        section.push_str(&format!(
            "| {} | {}{} | {} |\n",
            i + 1,
            marker,
            escape_cell(&contributor.username),
            contributor.entry_count
        ));
    }
    section.push('\n');

    section
}

fn generate_players_section(players: &[UserPlaytime]) -> String {
    if players.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Most Played\n\n");
    section.push_str("| User | Playtime |\n");
    section.push_str("|:---|:---:|\n");

    for player in players {
        section.push_str(&format!(
            "| {} | {} |\n",
            escape_cell(player.username.as_deref().unwrap_or(&player.uid)),
            player.total_playtime_formatted
        ));
    }
    section.push('\n');

    section
}

/// Generate the recent entries table.
fn generate_entries_section(entries: &[Entry]) -> String {
    let mut section = String::new();

    section.push_str("## Recent Entries\n\n");

    if entries.is_empty() {
        section.push_str("No custom entries yet.\n\n");
        return section;
    }

    section.push_str("| Type | Title | Creator | Rating | Category | Created |\n");
    section.push_str("|:---|:---|:---|:---|:---|:---|\n");

    for entry in entries {
        section.push_str(&generate_entry_row(entry));
    }
    section.push('\n');

    section
}

/// Generate a single entry row.
fn generate_entry_row(entry: &Entry) -> String {
    let record = &entry.record;
    let created = record
        .created_at()
        .map(|t| format_date(&t))
        .unwrap_or_else(|| "-".to_string());

    format!(
        "| {} | **{}** | {} | {} {}/5 | {} | {} |\n",
        entry.kind,
        escape_cell(record.title.as_deref().unwrap_or("-")),
        escape_cell(record.username.as_deref().unwrap_or("-")),
        "⭐".repeat(record.rating as usize),
        record.rating,
        escape_cell(record.category.as_deref().unwrap_or("-")),
        created
    )
}

/// Escape text for a Markdown table cell.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by Statboard*\n");

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryKind, EntryRecord};
    use chrono::TimeZone;
    use serde_json::json;

    fn create_test_snapshot() -> Snapshot {
        Snapshot {
            users: serde_json::from_value(json!({
                "u1": {"username": "ann", "createdAt": "2025-06-14T00:00:00Z",
                       "playtime": {"total": {"a": 4000}}},
                "u2": {"username": "ben"}
            }))
            .unwrap(),
            games: serde_json::from_value(json!({
                "g1": {"title": "Chess", "username": "ann", "rating": 4,
                       "category": "Strategy", "createdAt": "2025-06-10T00:00:00Z"}
            }))
            .unwrap(),
            websites: serde_json::from_value(json!({
                "w1": {"title": "Docs", "username": "ben", "createdAt": "2025-06-12T00:00:00Z"}
            }))
            .unwrap(),
        }
    }

    fn create_test_report() -> Report {
        let metadata = ReportMetadata {
            source: "in-memory export".to_string(),
            generated_at: Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap(),
            duration_seconds: 0.2,
        };
        build_report(&create_test_snapshot(), metadata, 10)
    }

    #[test]
    fn test_build_report() {
        let report = create_test_report();

        assert_eq!(report.stats.total_users, 2);
        assert_eq!(report.stats.recent_signups, 1);
        assert_eq!(report.stats.total_entries, 2);
        assert_eq!(report.top_contributors.len(), 2);
        assert_eq!(report.recent_entries[0].id, "w1");
        assert_eq!(report.top_players.len(), 1);
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# Statboard Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("## Entry Distribution"));
        assert!(markdown.contains("| Games | 1 | 50.0% |"));
        assert!(markdown.contains("## Top Contributors"));
        assert!(markdown.contains("## Recent Entries"));
        assert!(markdown.contains("1h 6m"));
    }

    #[test]
    fn test_generate_entry_row() {
        let record: EntryRecord = serde_json::from_value(json!({
            "title": "Chess",
            "username": "ann",
            "rating": 3,
            "category": "Strategy",
            "createdAt": "2025-03-07T00:00:00Z"
        }))
        .unwrap();
        let entry = Entry::annotate("g1", EntryKind::Game, &record);

        let row = generate_entry_row(&entry);

        assert!(row.contains("| game |"));
        assert!(row.contains("**Chess**"));
        assert!(row.contains("⭐⭐⭐ 3/5"));
        assert!(row.contains("Mar 7, 2025"));
    }

    #[test]
    fn test_table_cells_are_escaped() {
        let record: EntryRecord = serde_json::from_value(json!({
            "title": "Rock | Paper",
            "username": "a|b",
            "category": "Misc\nGames"
        }))
        .unwrap();
        let entry = Entry::annotate("g1", EntryKind::Game, &record);

        let row = generate_entry_row(&entry);
        assert!(row.contains("**Rock \\| Paper**"));
        assert!(row.contains("| a\\|b |"));
        assert!(row.contains("| Misc Games |"));
        assert_eq!(row.lines().count(), 1);

        let section = generate_contributors_section(&[ContributorSummary {
            username: "x|y".to_string(),
            entry_count: 2,
        }]);
        assert!(section.contains("📊 x\\|y | 2 |"));
    }

    #[test]
    fn test_empty_snapshot_report() {
        let metadata = ReportMetadata {
            source: "empty".to_string(),
            generated_at: Utc::now(),
            duration_seconds: 0.0,
        };
        let report = build_report(&Snapshot::default(), metadata, 10);
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("No custom entries yet."));
        assert!(!markdown.contains("## Entry Distribution"));
        assert!(!markdown.contains("## Top Contributors"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"stats\""));
        assert!(json.contains("\"topContributors\""));
        assert!(json.contains("\"totalPlaytimeFormatted\""));
    }
}
