//! Firebase Realtime Database REST client.
//!
//! Each read is a single `GET <database_url>/<path>.json`. Reads are never
//! retried here; a failure is reported to the caller as-is.

use super::{SnapshotStore, StoreError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// A read-only client for one Realtime Database instance.
pub struct FirebaseStore {
    http_client: reqwest::Client,
    database_url: String,
    auth_token: Option<String>,
    timeout_seconds: u64,
}

impl FirebaseStore {
    /// Create a client for `database_url`.
    ///
    /// `auth_token` is sent as the `auth` query parameter (a database secret
    /// or an ID token) when present.
    pub fn new(database_url: &str, auth_token: Option<String>, timeout_seconds: u64) -> Result<Self> {
        info!("Using Firebase database at {}", database_url);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            database_url: database_url.trim_end_matches('/').to_string(),
            auth_token,
            timeout_seconds,
        })
    }

    /// REST URL for a store path.
    fn url_for(&self, path: &str) -> String {
        format!("{}/{}.json", self.database_url, path.trim_matches('/'))
    }
}

#[async_trait]
impl SnapshotStore for FirebaseStore {
    async fn read(&self, path: &str) -> Result<Value, StoreError> {
        let url = self.url_for(path);
        debug!("GET {}", url);

        let mut request = self.http_client.get(&url);
        if let Some(ref token) = self.auth_token {
            request = request.query(&[("auth", token)]);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                StoreError::unavailable(
                    path,
                    format!("request timed out after {}s", self.timeout_seconds),
                )
            } else if e.is_connect() {
                StoreError::unavailable(
                    path,
                    format!("cannot connect to {}", self.database_url),
                )
            } else {
                StoreError::unavailable(path, format!("failed to send request: {}", e))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::unavailable(
                path,
                format!("Firebase API error {}: {}", status, body.trim()),
            ));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| StoreError::malformed(path, format!("invalid JSON response: {}", e)))
    }

    fn describe(&self) -> String {
        format!("Firebase database {}", self.database_url)
    }
}
