//! Workbook processing: `uploading → processing → completed | error`.

use sheetchart_core::models::{File, FileStatus, StatusUpdate};
use sheetchart_core::AppError;
use sheetchart_processing::{read_workbook, summarize};
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::handlers::FILE_NOT_FOUND;
use crate::state::AppState;

/// Parse the stored workbook and record its summary on the file.
///
/// A workbook that cannot be read is not a request failure: the file ends in
/// `error` with `processing_error` set and is returned like a successful run.
/// Any other failure after the file entered `processing` moves it to `error`
/// before the 500 is returned.
pub async fn process_file(state: &AppState, owner: Uuid, id: Uuid) -> Result<File, HttpAppError> {
    let file = match state
        .files
        .transition_status(owner, id, StatusUpdate::to(FileStatus::Processing))
        .await?
    {
        Some(file) => file,
        None => {
            return Err(match state.files.get_file(owner, id).await? {
                None => AppError::NotFound(FILE_NOT_FOUND.to_string()),
                Some(current) => AppError::Conflict(format!(
                    "File is {}; only uploading files can be processed",
                    current.status
                )),
            }
            .into())
        }
    };

    tracing::info!(file_id = %id, user_id = %owner, "Processing workbook");

    match run(state, &file).await {
        Ok(file) => Ok(file),
        Err(err) => {
            tracing::error!(file_id = %id, user_id = %owner, error = %err.0, "Workbook processing aborted");
            match state
                .files
                .transition_status(owner, id, StatusUpdate::failed("Processing failed"))
                .await
            {
                Ok(Some(_)) => tracing::info!(file_id = %id, "File moved to error after aborted processing"),
                Ok(None) => tracing::warn!(file_id = %id, "File left processing before it could be marked failed"),
                Err(e) => tracing::error!(file_id = %id, error = %e, "Failed to mark file as failed"),
            }
            Err(AppError::Internal(format!("Processing of file {} failed", id)).into())
        }
    }
}

/// Everything after the `processing` transition.
async fn run(state: &AppState, file: &File) -> Result<File, HttpAppError> {
    let (owner, id) = (file.uploaded_by, file.id);

    let update = match state.storage.download(file.storage_key()).await {
        Ok(bytes) => parse(bytes).await?,
        Err(e) => {
            tracing::error!(error = %e, file_id = %id, "Failed to read stored workbook");
            StatusUpdate::failed("Stored file could not be read")
        }
    };

    let failed = update.processing_error.clone();
    let file = state
        .files
        .transition_status(owner, id, update)
        .await?
        .ok_or_else(|| AppError::Conflict("File status changed during processing".to_string()))?;

    match failed {
        Some(reason) => {
            tracing::warn!(file_id = %id, user_id = %owner, reason = %reason, "Workbook processing failed")
        }
        None => tracing::info!(file_id = %id, user_id = %owner, "Workbook processed"),
    }

    Ok(file)
}

async fn parse(bytes: Vec<u8>) -> Result<StatusUpdate, HttpAppError> {
    let parsed = tokio::task::spawn_blocking(move || read_workbook(&bytes).map(|wb| summarize(&wb)))
        .await
        .map_err(|e| AppError::Internal(format!("Workbook parser task failed: {}", e)))?;

    Ok(match parsed {
        Ok(data) => StatusUpdate::completed(data),
        Err(e) => StatusUpdate::failed(e.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use bytes::Bytes;
    use sheetchart_core::models::NewFile;
    use sheetchart_core::AppConfig;
    use sheetchart_db::{FileStore, MemoryStore};
    use sheetchart_processing::fixtures::single_sheet_xlsx;
    use sheetchart_processing::worksheet::CellValue;
    use sheetchart_storage::{LocalStorage, Storage};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Fails the first transition out of `processing`, then defers to memory.
    struct FlakyFiles {
        inner: MemoryStore,
        tripped: AtomicBool,
    }

    #[async_trait]
    impl FileStore for FlakyFiles {
        async fn create_file(&self, new: NewFile) -> Result<File, AppError> {
            self.inner.create_file(new).await
        }

        async fn get_file(&self, owner: Uuid, id: Uuid) -> Result<Option<File>, AppError> {
            self.inner.get_file(owner, id).await
        }

        async fn list_files(&self, owner: Uuid) -> Result<Vec<File>, AppError> {
            self.inner.list_files(owner).await
        }

        async fn get_files_by_ids(&self, owner: Uuid, ids: &[Uuid]) -> Result<Vec<File>, AppError> {
            self.inner.get_files_by_ids(owner, ids).await
        }

        async fn record_download(&self, owner: Uuid, id: Uuid) -> Result<bool, AppError> {
            self.inner.record_download(owner, id).await
        }

        async fn transition_status(
            &self,
            owner: Uuid,
            id: Uuid,
            update: StatusUpdate,
        ) -> Result<Option<File>, AppError> {
            if update.status != FileStatus::Processing && !self.tripped.swap(true, Ordering::SeqCst) {
                return Err(AppError::Database(sqlx::Error::PoolTimedOut));
            }
            self.inner.transition_status(owner, id, update).await
        }
    }

    #[tokio::test]
    async fn store_failure_after_processing_starts_marks_file_failed() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut env = HashMap::new();
        env.insert("JWT_SECRET", "processing-test-secret-0123456789abcdef".to_string());
        env.insert("UPLOAD_DIR", temp_dir.path().display().to_string());
        let config = AppConfig::from_lookup(|key| env.get(key).cloned()).unwrap();

        let storage = LocalStorage::new(temp_dir.path()).await.unwrap();
        let workbook = single_sheet_xlsx(vec![
            vec![CellValue::Text("Month".into()), CellValue::Text("Revenue".into())],
            vec![CellValue::Number(1.0), CellValue::Number(100.0)],
        ]);
        storage
            .upload("excel-1-1.xlsx", "application/octet-stream", Bytes::from(workbook))
            .await
            .unwrap();

        let memory = MemoryStore::new();
        let files = Arc::new(FlakyFiles {
            inner: memory.clone(),
            tripped: AtomicBool::new(false),
        });
        let owner = Uuid::new_v4();
        let file = files
            .create_file(NewFile {
                filename: "excel-1-1.xlsx".into(),
                original_name: "sales.xlsx".into(),
                mimetype: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".into(),
                size: 8,
                path: "excel-1-1.xlsx".into(),
                uploaded_by: owner,
            })
            .await
            .unwrap();

        let state = AppState::new(config, files, Arc::new(memory.clone()), Arc::new(storage));
        let err = process_file(&state, owner, file.id).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        let stored = memory.get_file(owner, file.id).await.unwrap().unwrap();
        assert_eq!(stored.status, FileStatus::Error);
        assert_eq!(stored.processing_error.as_deref(), Some("Processing failed"));
        assert!(stored.processed_data.is_none());
    }

    #[tokio::test]
    async fn missing_file_uses_shared_not_found_message() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut env = HashMap::new();
        env.insert("JWT_SECRET", "processing-test-secret-0123456789abcdef".to_string());
        env.insert("UPLOAD_DIR", temp_dir.path().display().to_string());
        let config = AppConfig::from_lookup(|key| env.get(key).cloned()).unwrap();
        let storage = LocalStorage::new(temp_dir.path()).await.unwrap();
        let memory = MemoryStore::new();
        let state = AppState::new(
            config,
            Arc::new(memory.clone()),
            Arc::new(memory),
            Arc::new(storage),
        );

        let err = process_file(&state, Uuid::new_v4(), Uuid::new_v4()).await.unwrap_err();
        match err.0 {
            AppError::NotFound(message) => assert_eq!(message, FILE_NOT_FOUND),
            other => panic!("expected not found, got {:?}", other),
        }
    }
}
