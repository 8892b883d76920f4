//! Statboard - statistics API and dashboard for a Firebase Realtime Database
//!
//! Serves read-only aggregate statistics (users, signups, custom entries,
//! contributor rankings, playtime) computed on every request, plus the static
//! dashboard that charts them. Can also write a one-shot report instead.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, config, bind failure, store read failure)

mod analysis;
mod cli;
mod config;
mod models;
mod report;
mod server;
mod store;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, StoreConfig, DEFAULT_CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::ReportMetadata;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use store::{ExportStore, FirebaseStore, Snapshot, SnapshotStore};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Values in .env become env fallbacks for the CLI
    let dotenv = dotenvy::dotenv();

    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args)?;

    info!("Statboard v{}", env!("CARGO_PKG_VERSION"));
    if let Ok(path) = dotenv {
        debug!("Loaded environment from {}", path.display());
    }
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Statboard failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .statboard.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", DEFAULT_CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Set store.database_url (or store.export) before starting the server.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` overrides the level chosen by -v/-q.
fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(args.log_level().into()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Serve the API, or write a report when --report is given.
async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let store = open_store(&config.store)?;
    info!("Reading data from {}", store.describe());

    if let Some(ref output) = args.report {
        return run_report(store.as_ref(), &config, output, args.format, !args.quiet).await;
    }

    let state = server::State::new(store, &config.dashboard);
    server::serve(state, &config.server).await
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

/// Pick the data source: an export file if configured, else the live database.
fn open_store(config: &StoreConfig) -> Result<Arc<dyn SnapshotStore>> {
    if let Some(ref export) = config.export {
        return Ok(Arc::new(ExportStore::from_file(export)));
    }

    match config.database_url {
        Some(ref url) => Ok(Arc::new(FirebaseStore::new(
            url,
            config.auth_token.clone(),
            config.timeout_seconds,
        )?)),
        None => bail!(
            "No data source configured: set FIREBASE_DATABASE_URL, --database-url or --export"
        ),
    }
}

/// Read one snapshot and write a report file.
async fn run_report(
    store: &dyn SnapshotStore,
    config: &Config,
    output: &Path,
    format: OutputFormat,
    show_progress: bool,
) -> Result<()> {
    let start_time = Instant::now();

    let spinner = if show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .context("Invalid progress template")?,
        );
        pb.set_message(format!("Reading snapshots from {}", store.describe()));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let snapshot = Snapshot::read(store).await;

    if let Some(pb) = spinner {
        match snapshot {
            Ok(_) => pb.finish_with_message("Snapshots read"),
            Err(_) => pb.abandon_with_message("Snapshot read failed"),
        }
    }
    let snapshot = snapshot.context("Failed to read snapshots")?;

    let metadata = ReportMetadata {
        source: store.describe(),
        generated_at: Utc::now(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };
    let report = report::build_report(&snapshot, metadata, config.dashboard.top_contributors);

    let content = match format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    std::fs::write(output, &content)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    println!("\n📊 Statistics Summary:");
    println!("   Users: {} ({} new this week)", report.stats.total_users, report.stats.recent_signups);
    println!(
        "   Entries: {} ({} games, {} websites)",
        report.stats.total_entries, report.stats.total_games, report.stats.total_websites
    );
    println!("   Playtime: {}", report.stats.total_playtime_formatted);
    println!("\n✅ Report saved to: {}", output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_store_requires_a_source() {
        let result = open_store(&StoreConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_open_store_prefers_export() {
        let config = StoreConfig {
            database_url: Some("https://demo.firebaseio.com".to_string()),
            export: Some("dump.json".into()),
            ..Default::default()
        };

        let store = open_store(&config).unwrap();
        assert!(store.describe().contains("dump.json"));
    }

    #[tokio::test]
    async fn test_run_report_writes_file() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("report.md");
        let store = ExportStore::from_value(
            serde_json::from_str(include_str!("../fixtures/export.json")).unwrap(),
        );

        run_report(&store, &Config::default(), &output, OutputFormat::Markdown, false)
            .await
            .unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("# Statboard Report"));
        assert!(content.contains("alice"));
    }

    #[tokio::test]
    async fn test_run_report_fails_on_unavailable_store() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("report.json");
        let store = ExportStore::from_file(temp_dir.path().join("missing.json"));

        let result = run_report(&store, &Config::default(), &output, OutputFormat::Json, false).await;

        assert!(result.is_err());
        assert!(!output.exists());
    }
}
