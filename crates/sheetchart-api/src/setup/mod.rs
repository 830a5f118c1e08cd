//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use sheetchart_core::AppConfig;
use sheetchart_db::{ChartRepository, ChartStore, FileRepository, FileStore, MemoryStore};
use std::sync::Arc;

/// Build state and router from configuration.
///
/// With `DATABASE_URL` set, records live in PostgreSQL; otherwise an in-memory
/// store is used and everything is lost on restart.
pub async fn initialize_app(config: AppConfig) -> Result<(Arc<AppState>, axum::Router)> {
    let files: Arc<dyn FileStore>;
    let charts: Arc<dyn ChartStore>;
    match config.database_url() {
        Some(url) => {
            let pool = database::setup_database(
                url,
                config.db_max_connections(),
                config.db_timeout_seconds(),
                config.run_migrations(),
            )
            .await?;
            files = Arc::new(FileRepository::new(pool.clone()));
            charts = Arc::new(ChartRepository::new(pool));
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data will not persist");
            let store = MemoryStore::new();
            files = Arc::new(store.clone());
            charts = Arc::new(store);
        }
    }

    let storage = sheetchart_storage::create_storage(&config)
        .await
        .context("Failed to initialize storage")?;
    tracing::info!(
        backend = %storage.backend_type(),
        upload_dir = %config.upload_dir(),
        "Storage initialized"
    );

    let state = Arc::new(AppState::new(config.clone(), files, charts, storage));
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
