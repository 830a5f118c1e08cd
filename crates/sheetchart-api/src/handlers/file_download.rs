use crate::auth::models::OwnerContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::{parse_id, FILE_NOT_FOUND};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Response, StatusCode},
    response::IntoResponse,
};
use bytes::Bytes;
use futures::Stream;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use sheetchart_core::AppError;
use sheetchart_db::FileStore;
use sheetchart_storage::{ByteStream, StorageError};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/files/{id}/download",
    tag = "files",
    params(
        ("id" = uuid::Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Stored workbook bytes", content_type = "application/octet-stream"),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "File not found or not owned", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(state),
    fields(user_id = %owner.user_id, file_id = %id, operation = "download_file")
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    owner: OwnerContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let id = parse_id(&id)?;
    let file = state
        .files
        .get_file(owner.user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(FILE_NOT_FOUND.to_string()))?;

    let key = file.storage_key();
    let missing_object = |e: StorageError| -> HttpAppError {
        match e {
            StorageError::NotFound(_) => {
                tracing::error!(file_id = %id, storage_key = %key, "Stored object is missing");
                HttpAppError(AppError::NotFound(FILE_NOT_FOUND.to_string()))
            }
            other => other.into(),
        }
    };

    let length = state
        .storage
        .content_length(key)
        .await
        .map_err(missing_object)?;
    let stream = state
        .storage
        .download_stream(key)
        .await
        .map_err(missing_object)?;

    tracing::debug!(storage_key = %key, length, "Streaming file from storage");

    let body = CountedDownload::new(
        stream,
        length,
        DownloadTracker {
            files: state.files.clone(),
            owner: owner.user_id,
            file_id: id,
        },
    );

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, file.mimetype.as_str())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&file.original_name),
        )
        .header(header::CONTENT_LENGTH, length)
        .body(Body::from_stream(body))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// `attachment` disposition with an ASCII fallback name and the exact name as
/// RFC 5987 `filename*`.
fn content_disposition(original_name: &str) -> String {
    let fallback: String = original_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => format!("\\{}", c),
            c if c.is_ascii_graphic() || c == ' ' => c.to_string(),
            _ => "_".to_string(),
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        utf8_percent_encode(original_name, NON_ALPHANUMERIC)
    )
}

struct DownloadTracker {
    files: Arc<dyn FileStore>,
    owner: Uuid,
    file_id: Uuid,
}

impl DownloadTracker {
    fn record(self) {
        tokio::spawn(async move {
            match self.files.record_download(self.owner, self.file_id).await {
                Ok(true) => tracing::debug!(file_id = %self.file_id, "Download recorded"),
                Ok(false) => tracing::warn!(
                    file_id = %self.file_id,
                    "File disappeared before its download was recorded"
                ),
                Err(e) => tracing::error!(
                    error = %e,
                    file_id = %self.file_id,
                    "Failed to record download"
                ),
            }
        });
    }
}

/// Body stream that counts the download once every byte of the declared
/// length has been handed to the client. A length-delimited body is not
/// polled again after its last byte, so the count cannot wait for the end of
/// the stream. Errors and short reads are logged and never counted.
struct CountedDownload {
    inner: ByteStream,
    tracker: Option<DownloadTracker>,
    expected: u64,
    sent: u64,
    failed: bool,
}

impl CountedDownload {
    fn new(inner: ByteStream, expected: u64, tracker: DownloadTracker) -> Self {
        CountedDownload {
            inner,
            tracker: Some(tracker),
            expected,
            sent: 0,
            failed: false,
        }
    }

    fn complete(&mut self) {
        if self.failed {
            return;
        }
        if let Some(tracker) = self.tracker.take() {
            tracker.record();
        }
    }
}

impl Stream for CountedDownload {
    type Item = Result<Bytes, std::io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.as_mut().get_mut();
        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.sent += chunk.len() as u64;
                if this.sent >= this.expected {
                    this.complete();
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.failed = true;
                Poll::Ready(Some(Err(std::io::Error::other(format!(
                    "Storage stream error: {}",
                    e
                )))))
            }
            Poll::Ready(None) => {
                if this.sent < this.expected {
                    tracing::warn!(
                        sent = this.sent,
                        expected = this.expected,
                        "Stored object shorter than its recorded length"
                    );
                    this.failed = true;
                }
                this.complete();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for CountedDownload {
    fn drop(&mut self) {
        // an empty body is never polled
        if self.expected == 0 && self.sent == 0 {
            self.complete();
        }
        if let Some(tracker) = &self.tracker {
            tracing::warn!(
                file_id = %tracker.file_id,
                sent = self.sent,
                expected = self.expected,
                failed = self.failed,
                "Download ended before completion; not counted"
            );
        }
    }
}
