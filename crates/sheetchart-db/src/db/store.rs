use async_trait::async_trait;
use sheetchart_core::models::{Chart, File, NewChart, NewFile, StatusUpdate};
use sheetchart_core::AppError;
use uuid::Uuid;

/// File record operations. Every read and write is scoped to an owner.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn create_file(&self, new: NewFile) -> Result<File, AppError>;

    /// `None` both when the file does not exist and when it belongs to someone else.
    async fn get_file(&self, owner: Uuid, id: Uuid) -> Result<Option<File>, AppError>;

    /// Newest first.
    async fn list_files(&self, owner: Uuid) -> Result<Vec<File>, AppError>;

    /// Batch lookup; ids that are missing or not owned are left out.
    async fn get_files_by_ids(&self, owner: Uuid, ids: &[Uuid]) -> Result<Vec<File>, AppError>;

    /// Atomically bump the download counter and `last_accessed`.
    /// Returns false when no matching file exists.
    async fn record_download(&self, owner: Uuid, id: Uuid) -> Result<bool, AppError>;

    /// Apply `update` only if the file currently sits in the required
    /// predecessor state. `None` when the file is missing or the guard fails.
    async fn transition_status(
        &self,
        owner: Uuid,
        id: Uuid,
        update: StatusUpdate,
    ) -> Result<Option<File>, AppError>;
}

/// Chart record operations.
#[async_trait]
pub trait ChartStore: Send + Sync {
    async fn create_chart(&self, new: NewChart) -> Result<Chart, AppError>;

    /// Insert an auto-generated chart unless one already exists for the same
    /// (source file, owner). `None` means it was skipped.
    async fn insert_autogenerated(&self, new: NewChart) -> Result<Option<Chart>, AppError>;

    /// Whether the owner has any chart built from `file_id`.
    async fn exists_for_file(&self, owner: Uuid, file_id: Uuid) -> Result<bool, AppError>;

    /// Newest first.
    async fn list_charts(&self, owner: Uuid) -> Result<Vec<Chart>, AppError>;

    /// Increment `view_count`, set `last_viewed`, and return the updated chart.
    async fn record_view(&self, owner: Uuid, id: Uuid) -> Result<Option<Chart>, AppError>;
}
