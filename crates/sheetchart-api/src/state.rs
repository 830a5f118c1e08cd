//! Application state shared by every handler.

use sheetchart_core::AppConfig;
use sheetchart_db::{ChartStore, FileStore};
use sheetchart_storage::Storage;
use std::sync::Arc;

/// Config, record stores and the blob store. Handlers receive it as `State<Arc<AppState>>`.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub files: Arc<dyn FileStore>,
    pub charts: Arc<dyn ChartStore>,
    pub storage: Arc<dyn Storage>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        files: Arc<dyn FileStore>,
        charts: Arc<dyn ChartStore>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            config,
            files,
            charts,
            storage,
        }
    }
}
