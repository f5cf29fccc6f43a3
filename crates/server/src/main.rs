mod api;
mod metrics;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use debridarr_core::{
    load_config, validate_config, ArchiveStore, ArrClient, Consumer, DebridClient,
    FsArchiveStore, PremiumizeClient, StorageConfig, TransferManager,
};

use api::create_router;
use state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("DEBRIDARR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Library directory: {:?}", config.transfers.downloads_dir);
    info!("Scratch directory: {:?}", config.transfers.unzip_dir);

    // Create debrid client
    info!("Initializing Premiumize client at {}", config.premiumize.base_url);
    let debrid: Arc<dyn DebridClient> = Arc::new(PremiumizeClient::new(config.premiumize.clone()));

    // Create consumers, in config order
    let consumers: Vec<Arc<dyn Consumer>> = config
        .arrs
        .iter()
        .map(|arr| {
            info!("Initializing {} client '{}' at {}", arr.kind.as_str(), arr.name, arr.url);
            Arc::new(ArrClient::new(arr.clone())) as Arc<dyn Consumer>
        })
        .collect();
    if consumers.is_empty() {
        info!("No library managers configured, errored transfers will not be recovered");
    }

    // Create local archive store
    let store: Arc<dyn ArchiveStore> = Arc::new(FsArchiveStore::new(StorageConfig::new(
        &config.transfers.unzip_dir,
    )));

    // Create and start the transfer manager
    let manager = Arc::new(TransferManager::new(
        config.transfers.clone(),
        debrid,
        consumers,
        store,
    ));
    manager.start().await;
    info!("Transfer manager started");

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&manager)));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Downloads in flight are not cancelled; they end with the process
    info!("Stopping transfer manager...");
    manager.stop().await;
    info!("Server shut down");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
