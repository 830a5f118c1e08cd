//! Spreadsheet upload pipeline: extract → validate → store → persist.
//!
//! The declared size limit is enforced while the multipart field is read, so an
//! oversized upload is rejected before anything reaches storage.

use std::sync::Arc;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use bytes::{Bytes, BytesMut};
use sheetchart_core::constants::UPLOAD_FIELD_NAME;
use sheetchart_core::models::{File, NewFile};
use sheetchart_core::AppError;
use sheetchart_db::FileStore;
use sheetchart_processing::{UploadValidationError, UploadValidator};
use sheetchart_storage::{generate_stored_filename, Storage, StorageError};
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::AppState;

/// Fresh storage names tried before giving up on a colliding key.
const MAX_KEY_ATTEMPTS: usize = 3;

/// A validated spreadsheet read from the request body.
#[derive(Debug)]
pub struct SpreadsheetUpload {
    pub original_name: String,
    pub content_type: String,
    pub extension: String,
    pub data: Bytes,
}

pub struct UploadService {
    files: Arc<dyn FileStore>,
    storage: Arc<dyn Storage>,
    validator: UploadValidator,
}

impl UploadService {
    pub fn new(state: &AppState) -> Self {
        Self {
            files: state.files.clone(),
            storage: state.storage.clone(),
            validator: UploadValidator::new(state.config.max_file_size_bytes()),
        }
    }

    /// Complete upload workflow for `owner`.
    pub async fn upload(&self, owner: Uuid, multipart: Multipart) -> Result<File, HttpAppError> {
        let upload = self.extract(multipart).await?;
        let size = upload.data.len();

        let storage_key = self.store(&upload).await?;

        let new_file = NewFile {
            filename: storage_key.clone(),
            original_name: upload.original_name,
            mimetype: upload.content_type,
            size: size as i64,
            path: storage_key.clone(),
            uploaded_by: owner,
        };

        match self.files.create_file(new_file).await {
            Ok(file) => {
                tracing::info!(
                    file_id = %file.id,
                    user_id = %owner,
                    storage_key = %storage_key,
                    size,
                    "Spreadsheet uploaded"
                );
                Ok(file)
            }
            Err(e) => {
                tracing::error!(error = %e, storage_key = %storage_key, "Failed to record upload");
                self.discard(storage_key);
                Err(e.into())
            }
        }
    }

    /// Pull the `excel` field out of the form and validate it.
    pub async fn extract(&self, mut multipart: Multipart) -> Result<SpreadsheetUpload, HttpAppError> {
        let mut upload: Option<SpreadsheetUpload> = None;

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            if field.name() != Some(UPLOAD_FIELD_NAME) {
                continue;
            }
            if upload.is_some() {
                return Err(AppError::InvalidInput(format!(
                    "Multiple '{}' fields are not allowed",
                    UPLOAD_FIELD_NAME
                ))
                .into());
            }

            let original_name = field.file_name().unwrap_or("unknown").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();

            let extension = self.validator.validate_extension(&original_name)?;
            self.validator.validate_content_type(&content_type)?;

            let data = self.read_limited(field).await?;
            self.validator.validate_file_size(data.len())?;

            upload = Some(SpreadsheetUpload {
                original_name,
                content_type,
                extension,
                data,
            });
        }

        upload.ok_or_else(|| AppError::InvalidInput("No file uploaded".to_string()).into())
    }

    async fn read_limited(&self, mut field: Field<'_>) -> Result<Bytes, HttpAppError> {
        let max = self.validator.max_file_size();
        let mut buf = BytesMut::new();

        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if buf.len() + chunk.len() > max {
                return Err(UploadValidationError::FileTooLarge {
                    size: buf.len() + chunk.len(),
                    max,
                }
                .into());
            }
            buf.extend_from_slice(&chunk);
        }

        Ok(buf.freeze())
    }

    /// Write the bytes under a generated key, retrying on key collisions.
    async fn store(&self, upload: &SpreadsheetUpload) -> Result<String, HttpAppError> {
        for attempt in 1..=MAX_KEY_ATTEMPTS {
            let key = generate_stored_filename(&upload.extension);
            match self
                .storage
                .upload(&key, &upload.content_type, upload.data.clone())
                .await
            {
                Ok(()) => return Ok(key),
                Err(StorageError::AlreadyExists(_)) => {
                    tracing::warn!(storage_key = %key, attempt, "Storage key collision, retrying");
                }
                Err(e) => {
                    tracing::error!(error = %e, storage_key = %key, "Failed to upload to storage");
                    return Err(e.into());
                }
            }
        }

        Err(AppError::Storage(format!(
            "Could not allocate a unique storage key after {} attempts",
            MAX_KEY_ATTEMPTS
        ))
        .into())
    }

    /// Best-effort removal of an object whose record could not be written.
    fn discard(&self, storage_key: String) {
        let storage = self.storage.clone();
        tokio::spawn(async move {
            match storage.delete(&storage_key).await {
                Ok(()) => tracing::info!(storage_key = %storage_key, "Removed orphaned upload"),
                Err(e) => tracing::error!(
                    error = %e,
                    storage_key = %storage_key,
                    "Failed to remove orphaned upload"
                ),
            }
        });
    }
}

fn multipart_error(err: MultipartError) -> HttpAppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge(err.body_text()).into();
    }
    AppError::InvalidInput(format!("Failed to read multipart body: {}", err.body_text())).into()
}
