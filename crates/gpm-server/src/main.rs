//! GPM Server: application entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use gpm_auth::LogNotifier;
use gpm_db::DbManager;
use gpm_server::{AppState, load_config, router};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gpm-server")]
#[command(about = "GP practice manager authentication API")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, env = "GPM_CONFIG", default_value = "gpm.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gpm=info"));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let auth_config = config.auth_config()?;

    info!("Starting GPM server...");

    let db = DbManager::connect(&config.db_config())
        .await
        .context("connecting to SurrealDB")?;
    let applied = gpm_db::run_migrations(db.client())
        .await
        .context("running migrations")?;
    info!(applied, "Schema ready");

    let state = AppState::new(db.client().clone(), auth_config, Arc::new(LogNotifier));
    let app = router(state);

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("GPM server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received interrupt, shutting down gracefully..."),
        Err(e) => {
            warn!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
