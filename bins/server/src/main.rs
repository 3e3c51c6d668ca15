//! Quill API Server
//!
//! Main entry point for the Quill post service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quill_api::{AppState, create_router};
use quill_core::post::PostService;
use quill_core::storage::{StorageConfig, StorageService};
use quill_db::{PostStore, connect};
use quill_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Storage adapter, placeholder mode when credentials are missing
    let storage_config = StorageConfig::from_settings(&config.storage)
        .context("Invalid storage configuration")?;
    let storage = StorageService::from_config(storage_config)
        .context("Failed to initialize storage provider")?;
    if storage.is_configured() {
        info!(provider = storage.provider_name(), "Image storage configured");
    } else {
        warn!("Image storage not configured, posts will use placeholder images");
    }

    // Post store
    let store = match config.database.url.as_deref() {
        Some(url) => {
            let db = connect(url, &config.database).await?;
            info!("Connected to database");
            PostStore::postgres(db)
        }
        None => {
            warn!("No database URL configured, posts are kept in memory only");
            PostStore::memory()
        }
    };

    // Create application state
    let posts = PostService::new(Arc::new(storage), Arc::new(store))
        .with_raw_image_retention(config.storage.retain_raw_image);
    let state = AppState::new(posts);

    // Create router
    let app = create_router(state, &config.server);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
