//! JSON route handlers.
//!
//! Each handler reads only the collections it needs, concurrently where it
//! needs more than one, and wraps the result in a `{success: true, ...}`
//! envelope.

use super::error::ApiError;
use super::state::State;
use crate::analysis;
use crate::models::{
    ContributorSummary, Entry, EntryBreakdown, StatsSummary, UserPlaytime, UserSummary,
};
use crate::store::{self, Snapshot};
use axum::{extract, Json};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

type AppState = extract::State<Arc<State>>;

#[derive(Serialize)]
pub struct StatsResponse {
    success: bool,
    data: StatsSummary,
    /// Response generation time, ISO-8601.
    timestamp: String,
}

#[derive(Serialize)]
pub struct UsersResponse {
    success: bool,
    count: usize,
    data: Vec<UserSummary>,
}

#[derive(Serialize)]
pub struct PlaytimeResponse {
    success: bool,
    data: Vec<UserPlaytime>,
}

#[derive(Serialize)]
pub struct EntriesResponse {
    success: bool,
    count: usize,
    breakdown: EntryBreakdown,
    data: Vec<Entry>,
}

#[derive(Serialize)]
pub struct ContributorsResponse {
    success: bool,
    data: Vec<ContributorSummary>,
}

pub async fn stats_handler(extract::State(state): AppState) -> Result<Json<StatsResponse>, ApiError> {
    info!("Fetching global stats...");

    let snapshot = Snapshot::read(state.store.as_ref()).await?;
    let data = analysis::summarize(&snapshot.users, &snapshot.games, &snapshot.websites, Utc::now());

    debug!("Stats computed for {} users", data.total_users);

    Ok(Json(StatsResponse {
        success: true,
        data,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

pub async fn users_handler(extract::State(state): AppState) -> Result<Json<UsersResponse>, ApiError> {
    info!("Fetching users...");

    let users = store::read_users(state.store.as_ref()).await?;
    let data = analysis::list_users(&users);

    Ok(Json(UsersResponse {
        success: true,
        count: data.len(),
        data,
    }))
}

pub async fn playtime_handler(
    extract::State(state): AppState,
) -> Result<Json<PlaytimeResponse>, ApiError> {
    info!("Fetching playtime...");

    let users = store::read_users(state.store.as_ref()).await?;

    Ok(Json(PlaytimeResponse {
        success: true,
        data: analysis::user_playtimes(&users),
    }))
}

pub async fn entries_handler(
    extract::State(state): AppState,
) -> Result<Json<EntriesResponse>, ApiError> {
    info!("Fetching custom entries...");

    let (games, websites) = store::read_entries(state.store.as_ref()).await?;
    let merged = analysis::merge_entries(&games, &websites);

    Ok(Json(EntriesResponse {
        success: true,
        count: merged.entries.len(),
        breakdown: merged.breakdown,
        data: merged.entries,
    }))
}

pub async fn top_contributors_handler(
    extract::State(state): AppState,
) -> Result<Json<ContributorsResponse>, ApiError> {
    info!("Fetching top contributors...");

    let (games, websites) = store::read_entries(state.store.as_ref()).await?;

    Ok(Json(ContributorsResponse {
        success: true,
        data: analysis::rank_contributors(&games, &websites, state.top_contributors),
    }))
}
