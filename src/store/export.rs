//! Snapshots from a Firebase JSON export.
//!
//! An export is a JSON file with the same tree as the database root. File
//! backed stores re-read the file on every call so edits show up on the
//! next request, matching the live database's always-current reads.

use super::{SnapshotStore, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

enum Source {
    Memory(Value),
    File(PathBuf),
}

/// A store backed by an exported JSON tree.
pub struct ExportStore {
    source: Source,
}

impl ExportStore {
    /// Serve snapshots from an in-memory tree.
    pub fn from_value(root: Value) -> Self {
        Self {
            source: Source::Memory(root),
        }
    }

    /// A store with no data at all.
    pub fn empty() -> Self {
        Self::from_value(Value::Null)
    }

    /// Serve snapshots from an export file, read on each call.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::File(path.into()),
        }
    }

    async fn load_root(&self, path: &str) -> Result<Value, StoreError> {
        match &self.source {
            Source::Memory(root) => Ok(root.clone()),
            Source::File(file) => {
                debug!("Reading export file {}", file.display());
                let content = tokio::fs::read_to_string(file).await.map_err(|e| {
                    StoreError::unavailable(
                        path,
                        format!("cannot read {}: {}", file.display(), e),
                    )
                })?;

                serde_json::from_str(&content).map_err(|e| {
                    StoreError::malformed(path, format!("invalid JSON in {}: {}", file.display(), e))
                })
            }
        }
    }
}

/// Walk a slash-separated path into a JSON tree.
fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .try_fold(root, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

#[async_trait]
impl SnapshotStore for ExportStore {
    async fn read(&self, path: &str) -> Result<Value, StoreError> {
        let root = self.load_root(path).await?;
        Ok(lookup(&root, path).cloned().unwrap_or(Value::Null))
    }

    fn describe(&self) -> String {
        match &self.source {
            Source::Memory(_) => "in-memory export".to_string(),
            Source::File(file) => format!("export file {}", file.display()),
        }
    }
}
