//! fivewhy-api - root-cause-analysis HTTP service
//!
//! Serves the record store, analytics frequency tables and root-cause
//! predictions from the trained model artifact.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fivewhy_api::{build_router, load_engine, AppState};
use fivewhy_common::config::{RootFolderInitializer, RootFolderResolver, ServiceConfig, TomlConfig};
use fivewhy_common::db;
use tokio::signal;
use tracing::{error, info};

/// Command-line arguments for fivewhy-api
#[derive(Parser, Debug)]
#[command(name = "fivewhy-api")]
#[command(about = "Root cause analysis API for equipment failures")]
#[command(version)]
struct Args {
    /// Root folder holding the database and model artifact
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML config file (defaults to FIVEWHY_CONFIG or the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides the config file)
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_path = args.config.clone().or_else(TomlConfig::default_path);
    let toml = TomlConfig::load_or_default(toml_path.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&toml.logging.level)),
        )
        .init();

    info!("Starting fivewhy-api v{}", env!("CARGO_PKG_VERSION"));

    let root_folder = RootFolderResolver::new("fivewhy-api")
        .with_toml(toml.clone())
        .with_cli_arg(args.root_folder.clone())
        .resolve();
    RootFolderInitializer::new(root_folder.clone()).ensure_directory_exists()?;
    let config = ServiceConfig::from_sources(root_folder, &toml)?;
    info!("Database path: {}", config.database_path.display());
    info!("Model path: {}", config.model_path.display());

    let pool = match db::init_database(&config.database_path).await {
        Ok(pool) => {
            info!("✓ Connected to database");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let engine = load_engine(&config.model_path).await;
    let state = AppState::new(pool, engine, config.model_path.clone())
        .with_review_threshold(config.review_threshold)
        .with_cors_origin(config.cors_origin.clone());
    let app = build_router(state);

    let addr = args.bind.unwrap_or(config.bind_address);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("fivewhy-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
