//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::analysis::TOP_CONTRIBUTORS_LIMIT;
use clap::Parser;
use std::path::PathBuf;

/// Statboard - statistics API and dashboard for a Firebase Realtime Database
///
/// Serves aggregate user, entry, contributor and playtime statistics as JSON
/// and hosts the browser dashboard that charts them. Read-only.
///
/// Examples:
///   statboard --database-url https://my-app-default-rtdb.firebaseio.com
///   statboard --export ./backup.json --port 8080
///   statboard --export ./backup.json --report stats.md
///   statboard --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Firebase Realtime Database URL
    #[arg(long, value_name = "URL", env = "FIREBASE_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Credential sent as the `auth` query parameter (database secret or ID token)
    #[arg(long, value_name = "TOKEN", env = "FIREBASE_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Read data from a Firebase JSON export instead of a live database
    ///
    /// Takes precedence over --database-url.
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Address to bind the HTTP server to
    #[arg(long, value_name = "ADDR")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, value_name = "PORT", env = "PORT")]
    pub port: Option<u16>,

    /// Directory with the dashboard's static files
    #[arg(long, value_name = "DIR")]
    pub static_dir: Option<PathBuf>,

    /// Request timeout in seconds for live database reads
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Number of contributors returned by the ranking endpoint (1 to 10)
    #[arg(long, value_name = "COUNT")]
    pub top_contributors: Option<usize>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .statboard.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write a one-shot statistics report to this file instead of serving
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Report format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .statboard.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.database_url {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err("Database URL must start with 'https://' or 'http://'".to_string());
            }
        }

        if let Some(ref export) = self.export {
            if !export.is_file() {
                return Err(format!("Export file does not exist: {}", export.display()));
            }
        }

        if self.port == Some(0) {
            return Err("Port must be between 1 and 65535".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if let Some(limit) = self.top_contributors {
            if !(1..=TOP_CONTRIBUTORS_LIMIT).contains(&limit) {
                return Err(format!(
                    "Top contributors must be between 1 and {}",
                    TOP_CONTRIBUTORS_LIMIT
                ));
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_args() -> Args {
        Args {
            database_url: None,
            auth_token: None,
            export: None,
            host: None,
            port: None,
            static_dir: None,
            timeout: None,
            top_contributors: None,
            config: None,
            report: None,
            format: OutputFormat::Markdown,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_accepts_defaults() {
        let mut args = make_args();
        args.database_url = Some("https://demo-default-rtdb.firebaseio.com".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.database_url = Some("demo.firebaseio.com".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_export() {
        let mut args = make_args();
        args.export = Some(PathBuf::from("/definitely/not/here.json"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_values() {
        let mut args = make_args();
        args.port = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.timeout = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.top_contributors = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_contributor_limit_upper_bound() {
        let mut args = make_args();
        args.top_contributors = Some(TOP_CONTRIBUTORS_LIMIT);
        assert!(args.validate().is_ok());

        args.top_contributors = Some(TOP_CONTRIBUTORS_LIMIT + 1);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "statboard",
            "--export",
            "dump.json",
            "--report",
            "out.json",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(args.export, Some(PathBuf::from("dump.json")));
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
