//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.statboard.toml` files.

use crate::analysis::TOP_CONTRIBUTORS_LIMIT;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".statboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Data source settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Dashboard settings.
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the dashboard's static files.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

/// Data source settings.
///
/// Exactly one of `database_url` and `export` should be set; `export` wins
/// when both are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Firebase Realtime Database URL.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Credential sent as the `auth` query parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Firebase JSON export to read instead of a live database.
    #[serde(default)]
    pub export: Option<PathBuf>,

    /// Request timeout in seconds for live reads.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            auth_token: None,
            export: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

/// Dashboard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Number of contributors returned by `/api/top-contributors`.
    #[serde(default = "default_top_contributors")]
    pub top_contributors: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            top_contributors: default_top_contributors(),
        }
    }
}

fn default_top_contributors() -> usize {
    TOP_CONTRIBUTORS_LIMIT
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and their environment fallbacks) take precedence over
    /// config file settings, but only when explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref host) = args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(ref static_dir) = args.static_dir {
            self.server.static_dir = static_dir.clone();
        }

        // A source given on the command line replaces the configured one
        if let Some(ref url) = args.database_url {
            self.store.database_url = Some(url.clone());
            self.store.export = None;
        }
        if let Some(ref export) = args.export {
            self.store.export = Some(export.clone());
            self.store.database_url = None;
        }
        if let Some(ref token) = args.auth_token {
            self.store.auth_token = Some(token.clone());
        }
        if let Some(timeout) = args.timeout {
            self.store.timeout_seconds = timeout;
        }

        if let Some(limit) = args.top_contributors {
            self.dashboard.top_contributors = limit;
        }
    }

    /// Check values that neither the file parser nor the CLI can bound.
    pub fn validate(&self) -> Result<()> {
        let limit = self.dashboard.top_contributors;
        if !(1..=TOP_CONTRIBUTORS_LIMIT).contains(&limit) {
            bail!(
                "dashboard.top_contributors must be between 1 and {}, got {}",
                TOP_CONTRIBUTORS_LIMIT,
                limit
            );
        }

        if self.store.timeout_seconds == 0 {
            bail!("store.timeout_seconds must be at least 1");
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let mut config = Config::default();
        config.store.database_url = Some("https://<project>-default-rtdb.firebaseio.com".to_string());
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::make_args;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.static_dir, PathBuf::from("public"));
        assert_eq!(config.store.timeout_seconds, 30);
        assert_eq!(config.dashboard.top_contributors, 10);
        assert!(config.store.database_url.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[server]
port = 8080
static_dir = "web"

[store]
database_url = "https://demo-default-rtdb.firebaseio.com"
timeout_seconds = 10

[dashboard]
top_contributors = 3
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.static_dir, PathBuf::from("web"));
        assert_eq!(
            config.store.database_url.as_deref(),
            Some("https://demo-default-rtdb.firebaseio.com")
        );
        assert_eq!(config.store.timeout_seconds, 10);
        assert_eq!(config.dashboard.top_contributors, 3);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("custom.toml");
        std::fs::write(&path, "[server]\nport = 4000\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.port, 4000);

        std::fs::write(&path, "[server\n").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_merge_prefers_explicit_args() {
        let mut config: Config = toml::from_str(
            "[server]\nport = 8080\n[store]\nexport = \"dump.json\"\n",
        )
        .unwrap();

        let mut args = make_args();
        args.database_url = Some("https://demo.firebaseio.com".to_string());
        args.top_contributors = Some(5);
        config.merge_with_args(&args);

        assert_eq!(config.server.port, 8080);
        assert_eq!(
            config.store.database_url.as_deref(),
            Some("https://demo.firebaseio.com")
        );
        assert!(config.store.export.is_none());
        assert_eq!(config.dashboard.top_contributors, 5);
    }

    #[test]
    fn test_validate_bounds_contributor_limit() {
        assert!(Config::default().validate().is_ok());

        let over: Config = toml::from_str("[dashboard]\ntop_contributors = 50\n").unwrap();
        assert!(over.validate().is_err());

        let zero: Config = toml::from_str("[dashboard]\ntop_contributors = 0\n").unwrap();
        assert!(zero.validate().is_err());

        let zero_timeout: Config = toml::from_str("[store]\ntimeout_seconds = 0\n").unwrap();
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("[dashboard]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.port, 3000);
    }
}
