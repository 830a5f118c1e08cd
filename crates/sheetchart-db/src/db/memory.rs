use async_trait::async_trait;
use chrono::Utc;
use sheetchart_core::models::{Chart, File, NewChart, NewFile, StatusUpdate};
use sheetchart_core::AppError;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{ChartStore, FileStore};

#[derive(Default)]
struct Collections {
    // insertion order; newest last
    files: Vec<File>,
    charts: Vec<Chart>,
}

/// In-process store used when no database is configured, and in tests.
///
/// All writes go through one lock, so the auto-generated chart uniqueness
/// holds the same way the partial unique index guarantees it in PostgreSQL.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(mut items: Vec<T>, created: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    items.reverse();
    items.sort_by_key(|item| std::cmp::Reverse(created(item)));
    items
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn create_file(&self, new: NewFile) -> Result<File, AppError> {
        let mut inner = self.inner.write().await;
        if inner.files.iter().any(|f| f.filename == new.filename) {
            return Err(AppError::Conflict(format!(
                "File {} already exists",
                new.filename
            )));
        }
        let file = File::from_new(Uuid::new_v4(), new, Utc::now());
        inner.files.push(file.clone());
        Ok(file)
    }

    async fn get_file(&self, owner: Uuid, id: Uuid) -> Result<Option<File>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .files
            .iter()
            .find(|f| f.id == id && f.uploaded_by == owner)
            .cloned())
    }

    async fn list_files(&self, owner: Uuid) -> Result<Vec<File>, AppError> {
        let inner = self.inner.read().await;
        let owned = inner
            .files
            .iter()
            .filter(|f| f.uploaded_by == owner)
            .cloned()
            .collect();
        Ok(newest_first(owned, |f| f.created_at))
    }

    async fn get_files_by_ids(&self, owner: Uuid, ids: &[Uuid]) -> Result<Vec<File>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .files
            .iter()
            .filter(|f| f.uploaded_by == owner && ids.contains(&f.id))
            .cloned()
            .collect())
    }

    async fn record_download(&self, owner: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        match inner
            .files
            .iter_mut()
            .find(|f| f.id == id && f.uploaded_by == owner)
        {
            Some(file) => {
                file.download_count += 1;
                file.last_accessed = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn transition_status(
        &self,
        owner: Uuid,
        id: Uuid,
        update: StatusUpdate,
    ) -> Result<Option<File>, AppError> {
        let mut inner = self.inner.write().await;
        let Some(file) = inner
            .files
            .iter_mut()
            .find(|f| f.id == id && f.uploaded_by == owner)
        else {
            return Ok(None);
        };

        if !file.status.can_transition_to(update.status) {
            return Ok(None);
        }

        file.status = update.status;
        file.processing_error = update.processing_error;
        if let Some(data) = update.processed_data {
            file.processed_data = Some(data);
        }
        file.updated_at = Utc::now();
        Ok(Some(file.clone()))
    }
}

#[async_trait]
impl ChartStore for MemoryStore {
    async fn create_chart(&self, new: NewChart) -> Result<Chart, AppError> {
        let chart = Chart::from_new(Uuid::new_v4(), new, Utc::now());
        self.inner.write().await.charts.push(chart.clone());
        Ok(chart)
    }

    async fn insert_autogenerated(&self, new: NewChart) -> Result<Option<Chart>, AppError> {
        let mut inner = self.inner.write().await;
        let taken = inner.charts.iter().any(|c| {
            c.auto_generated && c.source_file == new.source_file && c.created_by == new.created_by
        });
        if taken {
            return Ok(None);
        }
        let chart = Chart::from_new(Uuid::new_v4(), new, Utc::now());
        inner.charts.push(chart.clone());
        Ok(Some(chart))
    }

    async fn exists_for_file(&self, owner: Uuid, file_id: Uuid) -> Result<bool, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .charts
            .iter()
            .any(|c| c.source_file == file_id && c.created_by == owner))
    }

    async fn list_charts(&self, owner: Uuid) -> Result<Vec<Chart>, AppError> {
        let inner = self.inner.read().await;
        let owned = inner
            .charts
            .iter()
            .filter(|c| c.created_by == owner)
            .cloned()
            .collect();
        Ok(newest_first(owned, |c| c.created_at))
    }

    async fn record_view(&self, owner: Uuid, id: Uuid) -> Result<Option<Chart>, AppError> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .charts
            .iter_mut()
            .find(|c| c.id == id && c.created_by == owner)
            .map(|chart| {
                chart.view_count += 1;
                chart.last_viewed = Some(Utc::now());
                chart.clone()
            }))
    }
}
