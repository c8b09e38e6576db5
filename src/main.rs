//! Catalog Pager - article listing server
//!
//! Serves cached, cursor-paginated article listings over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog_pager::catalog::{CatalogRepository, InMemoryCatalog};
use catalog_pager::{create_router, AppState, Config, KeyValueStore, MemoryStore};

/// Main entry point for the listing server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Load the catalog snapshot, if one is configured
/// 4. Create the shared store and the cache namespaces on it
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_pager=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Catalog Pager");

    let config = Config::from_env();
    info!(
        port = config.server_port,
        result_ttl = config.result_ttl,
        count_ttl = config.count_ttl,
        tag_ttl = config.tag_ttl,
        default_page_limit = config.default_page_limit,
        max_page_limit = config.max_page_limit,
        "Configuration loaded"
    );

    let catalog = match &config.catalog_path {
        Some(path) => InMemoryCatalog::from_json_file(path)
            .with_context(|| format!("loading catalog snapshot from {path}"))?,
        None => {
            warn!("CATALOG_PATH not set, serving an empty catalog");
            InMemoryCatalog::default()
        }
    };
    info!(articles = catalog.len(), "Catalog loaded");
    let repository: Arc<dyn CatalogRepository> = Arc::new(catalog);

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let state = AppState::from_config(&config, store.clone(), repository);
    info!("Cache namespaces initialized");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    if let Err(err) = store.quit().await {
        warn!(error = %err, "Store did not close cleanly");
    }
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
