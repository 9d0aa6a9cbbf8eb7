//! AutoPrint Server
//!
//! Receives wins detected on a live-auction stream page, keeps a per-show
//! ledger of them, and prints a label for each new win.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use autoprint_core::PipelineBuilder;
use clap::Parser;
use config::ConfigLoader;
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// AutoPrint - label printing for live-auction wins
#[derive(Parser, Debug)]
#[command(name = "autoprint-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./autoprint-config.toml", env = "AUTOPRINT_CONFIG")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting autoprint-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let (config_loader, loaded_config) =
        ConfigLoader::load(&args.config, args.listen).map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;
    let config_loader = Arc::new(config_loader);
    tracing::info!("Configuration loaded from {:?}", config_loader.path());

    let listen_addr = loaded_config.listen;
    std::fs::create_dir_all(&loaded_config.pipeline.ledger.dir)?;

    // Start the pipeline; the active show, if any, is resumed
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (pipeline, dispatcher_handle) = PipelineBuilder::new(loaded_config.pipeline)
        .with_settings(loaded_config.settings)
        .with_registry(loaded_config.registry)
        .with_persistence(config_loader.clone())
        .start(shutdown_rx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to start the pipeline: {}", e);
            e
        })?;
    if let Some(show_id) = pipeline.sessions.active_show_id().await {
        tracing::info!(%show_id, "Resumed active show");
    }

    // Create application state
    let state = AppState::new(pipeline);

    // Spawn config reload handler (listens for SIGHUP)
    let shutdown_notify = spawn_config_reload_handler(state.clone(), config_loader);

    // Build the router
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Signal the config reload handler to stop
    shutdown_notify.notify_one();

    // Let in-flight dispatches finish
    tracing::info!("Draining dispatcher...");
    let _ = shutdown_tx.send(true);
    if let Err(e) = dispatcher_handle.await {
        tracing::error!("Dispatcher task failed: {}", e);
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
