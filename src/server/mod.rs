//! HTTP surface: the JSON API and the dashboard's static files.
//!
//! Routes map one-to-one onto aggregation calls. Any store failure becomes a
//! `{success: false, error}` envelope; nothing is retried or cached.

pub mod error;
pub mod routes;
pub mod state;

use crate::config::ServerConfig;
use anyhow::{Context, Result};
use axum::http::header::CONTENT_TYPE;
use axum::http::Method;
use axum::routing::get;
use axum::Router;
use routes::{
    entries_handler, playtime_handler, stats_handler, top_contributors_handler, users_handler,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub use state::State;

/// Build the application router.
pub fn router(state: Arc<State>, static_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/stats", get(stats_handler))
        .route("/api/users", get(users_handler))
        .route("/api/playtime", get(playtime_handler))
        .route("/api/entries", get(entries_handler))
        .route("/api/top-contributors", get(top_contributors_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until Ctrl+C or SIGTERM.
pub async fn serve(state: Arc<State>, config: &ServerConfig) -> Result<()> {
    if !config.static_dir.is_dir() {
        warn!(
            "Static directory {} not found, dashboard will not be served",
            config.static_dir.display()
        );
    }

    let app = router(state, &config.static_dir);

    let address = format!("{}:{}", config.host, config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server is running on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
