//! Read-only access to the document store.
//!
//! The store is addressed by slash-separated paths into one JSON tree, the
//! way Firebase Realtime Database lays out its data. Only three collections
//! are read: users, game entries and website entries.

pub mod export;
pub mod firebase;

pub use export::ExportStore;
pub use firebase::FirebaseStore;

use crate::models::{Collection, EntryRecord, UserRecord};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Path of the users collection.
pub const USERS_PATH: &str = "users";
/// Path of the custom game entries collection.
pub const GAMES_PATH: &str = "customEntries/games";
/// Path of the custom website entries collection.
pub const WEBSITES_PATH: &str = "customEntries/websites";

/// Failure reading a snapshot.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing read failed (transport, timeout, bad status, unreadable file).
    #[error("Store unavailable while reading '{path}': {message}")]
    Unavailable { path: String, message: String },

    /// The snapshot arrived but is not a readable collection.
    #[error("Malformed snapshot at '{path}': {message}")]
    Malformed { path: String, message: String },
}

impl StoreError {
    pub fn unavailable(path: &str, message: impl ToString) -> Self {
        Self::Unavailable {
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    pub fn malformed(path: &str, message: impl ToString) -> Self {
        Self::Malformed {
            path: path.to_string(),
            message: message.to_string(),
        }
    }
}

/// A source of point-in-time JSON snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read the value stored at `path`. Absent data reads as `Value::Null`.
    async fn read(&self, path: &str) -> Result<Value, StoreError>;

    /// Short description of where data comes from, for logs and reports.
    fn describe(&self) -> String;
}

/// Read and decode one collection.
pub async fn read_collection<T>(
    store: &dyn SnapshotStore,
    path: &str,
) -> Result<Collection<T>, StoreError>
where
    T: DeserializeOwned,
{
    let value = store.read(path).await?;
    let collection: Collection<T> =
        serde_json::from_value(value).map_err(|e| StoreError::malformed(path, e))?;

    debug!("Read {} records from {}", collection.len(), path);
    Ok(collection)
}

pub async fn read_users(store: &dyn SnapshotStore) -> Result<Collection<UserRecord>, StoreError> {
    read_collection(store, USERS_PATH).await
}

pub async fn read_games(store: &dyn SnapshotStore) -> Result<Collection<EntryRecord>, StoreError> {
    read_collection(store, GAMES_PATH).await
}

pub async fn read_websites(
    store: &dyn SnapshotStore,
) -> Result<Collection<EntryRecord>, StoreError> {
    read_collection(store, WEBSITES_PATH).await
}

/// Both entry collections, read concurrently.
pub async fn read_entries(
    store: &dyn SnapshotStore,
) -> Result<(Collection<EntryRecord>, Collection<EntryRecord>), StoreError> {
    futures::try_join!(read_games(store), read_websites(store))
}

/// All three collections, read concurrently.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub users: Collection<UserRecord>,
    pub games: Collection<EntryRecord>,
    pub websites: Collection<EntryRecord>,
}

impl Snapshot {
    /// Read every collection; any failed read fails the whole snapshot.
    pub async fn read(store: &dyn SnapshotStore) -> Result<Self, StoreError> {
        let (users, (games, websites)) =
            futures::try_join!(read_users(store), read_entries(store))?;

        Ok(Self {
            users,
            games,
            websites,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_snapshot_read_from_export() {
        let store = ExportStore::from_value(json!({
            "users": {"u1": {"username": "ann"}},
            "customEntries": {
                "games": {"g1": {"title": "Go"}, "g2": {"title": "Chess"}}
            }
        }));

        let snapshot = tokio_test::block_on(Snapshot::read(&store)).unwrap();

        assert_eq!(snapshot.users.len(), 1);
        assert_eq!(snapshot.games.len(), 2);
        assert!(snapshot.websites.is_empty());
    }

    #[test]
    fn test_odd_record_fields_do_not_fail_snapshot() {
        let store = ExportStore::from_value(json!({
            "users": {"u1": {"username": 42}, "u2": {"email": ["x"]}},
            "customEntries": {"games": {"g1": {"title": 7, "rating": "high"}}}
        }));

        let snapshot = tokio_test::block_on(Snapshot::read(&store)).unwrap();
        let stats = analysis::summarize(
            &snapshot.users,
            &snapshot.games,
            &snapshot.websites,
            Utc::now(),
        );

        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.total_games, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_malformed_collection_fails_whole_snapshot() {
        let store = ExportStore::from_value(json!({
            "users": {"u1": {}},
            "customEntries": {"websites": "oops"}
        }));

        let err = tokio_test::block_on(Snapshot::read(&store)).unwrap_err();

        assert!(matches!(err, StoreError::Malformed { ref path, .. } if path == WEBSITES_PATH));
    }

    #[test]
    fn test_document_order_survives_parsing() {
        let root: Value = serde_json::from_str(
            r#"{"customEntries": {"games": {
                "zz": {"username": "zoe"},
                "mm": {"username": "abe"}
            }}}"#,
        )
        .unwrap();
        let store = ExportStore::from_value(root);

        let (games, websites) = tokio_test::block_on(read_entries(&store)).unwrap();
        let ids: Vec<_> = games.iter().map(|(id, _)| id).collect();
        let ranking = analysis::rank_contributors(&games, &websites, 10);
        let names: Vec<_> = ranking.iter().map(|c| c.username.as_str()).collect();

        assert_eq!(ids, vec!["zz", "mm"]);
        assert_eq!(names, vec!["zoe", "abe"]);
    }

    #[test]
    fn test_store_error_messages() {
        let err = StoreError::unavailable("users", "connection refused");
        assert_eq!(
            err.to_string(),
            "Store unavailable while reading 'users': connection refused"
        );
    }
}
