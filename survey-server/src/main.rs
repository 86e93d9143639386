//! survey-server - Survey generation and analytics service
//!
//! Serves the REST API for generating surveys with a language model,
//! storing them, collecting responses and downloading analytics reports.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use survey_common::config::{RootFolderInitializer, RootFolderResolver};
use survey_server::config::resolve_openai_settings;
use survey_server::AppState;

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8000";

/// Command-line arguments for survey-server
#[derive(Parser, Debug)]
#[command(name = "survey-server")]
#[command(about = "Survey generation and analytics service")]
#[command(version)]
struct Args {
    /// Root folder holding the database (overrides env and config file)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8000
    #[arg(short, long, env = "SURVEY_BIND_ADDRESS")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = RootFolderResolver::new("survey-server");
    let toml = resolver.toml().clone();

    // RUST_LOG wins over the config file level
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&toml.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting survey-server v{} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolver.resolve_with(args.root_folder.as_deref());
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db = survey_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let openai = resolve_openai_settings(&db, &toml)
        .await
        .context("Failed to resolve OpenAI settings")?;
    if openai.api_key.is_none() {
        info!("No OpenAI API key configured; generation endpoints return 503 until one is set");
    }
    info!("Model: {}", openai.model);

    let state = AppState::new(db, openai);
    let app = survey_server::build_router(state);

    let bind = args
        .bind
        .or(toml.bind_address)
        .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    info!("Listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

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
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
