use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sheetchart_core::models::{File, FileStatus, NewFile, ProcessedData, StatusUpdate};
use sheetchart_core::AppError;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::store::FileStore;

const FILE_COLUMNS: &str = "id, filename, original_name, mimetype, size, path, uploaded_by, \
     status, processing_error, processed_data, tags, description, is_public, \
     download_count, last_accessed, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct FileRow {
    id: Uuid,
    filename: String,
    original_name: String,
    mimetype: String,
    size: i64,
    path: String,
    uploaded_by: Uuid,
    status: FileStatus,
    processing_error: Option<String>,
    processed_data: Option<Json<ProcessedData>>,
    tags: Vec<String>,
    description: Option<String>,
    is_public: bool,
    download_count: i64,
    last_accessed: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FileRow> for File {
    fn from(row: FileRow) -> Self {
        File {
            id: row.id,
            filename: row.filename,
            original_name: row.original_name,
            mimetype: row.mimetype,
            size: row.size,
            path: row.path,
            uploaded_by: row.uploaded_by,
            status: row.status,
            processing_error: row.processing_error,
            processed_data: row.processed_data.map(|Json(data)| data),
            tags: row.tags,
            description: row.description,
            is_public: row.is_public,
            download_count: row.download_count,
            last_accessed: row.last_accessed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL-backed file records.
#[derive(Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileStore for FileRepository {
    #[tracing::instrument(skip(self, new), fields(db.table = "files", db.operation = "insert", user_id = %new.uploaded_by))]
    async fn create_file(&self, new: NewFile) -> Result<File, AppError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let row = sqlx::query_as::<Postgres, FileRow>(&format!(
            r#"
            INSERT INTO files (
                id, filename, original_name, mimetype, size, path, uploaded_by,
                status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING {}
            "#,
            FILE_COLUMNS
        ))
        .bind(id)
        .bind(&new.filename)
        .bind(&new.original_name)
        .bind(&new.mimetype)
        .bind(new.size)
        .bind(&new.path)
        .bind(new.uploaded_by)
        .bind(FileStatus::Uploading)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, filename = %new.filename, "Failed to insert file record");
            AppError::Database(e)
        })?;

        Ok(row.into())
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select", db.record_id = %id))]
    async fn get_file(&self, owner: Uuid, id: Uuid) -> Result<Option<File>, AppError> {
        let row = sqlx::query_as::<Postgres, FileRow>(&format!(
            "SELECT {} FROM files WHERE id = $1 AND uploaded_by = $2",
            FILE_COLUMNS
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(File::from))
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select"))]
    async fn list_files(&self, owner: Uuid) -> Result<Vec<File>, AppError> {
        let rows = sqlx::query_as::<Postgres, FileRow>(&format!(
            "SELECT {} FROM files WHERE uploaded_by = $1 ORDER BY created_at DESC, id DESC",
            FILE_COLUMNS
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(File::from).collect())
    }

    #[tracing::instrument(skip(self, ids), fields(db.table = "files", db.operation = "select", count = ids.len()))]
    async fn get_files_by_ids(&self, owner: Uuid, ids: &[Uuid]) -> Result<Vec<File>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<Postgres, FileRow>(&format!(
            "SELECT {} FROM files WHERE uploaded_by = $1 AND id = ANY($2)",
            FILE_COLUMNS
        ))
        .bind(owner)
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(File::from).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "update", db.record_id = %id))]
    async fn record_download(&self, owner: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE files
            SET download_count = download_count + 1, last_accessed = NOW()
            WHERE id = $1 AND uploaded_by = $2
            "#,
        )
        .bind(id)
        .bind(owner)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self, update), fields(db.table = "files", db.operation = "update", db.record_id = %id, status = %update.status))]
    async fn transition_status(
        &self,
        owner: Uuid,
        id: Uuid,
        update: StatusUpdate,
    ) -> Result<Option<File>, AppError> {
        let Some(required) = update.status.predecessor() else {
            return Ok(None);
        };

        let row = sqlx::query_as::<Postgres, FileRow>(&format!(
            r#"
            UPDATE files
            SET status = $1,
                processing_error = $2,
                processed_data = COALESCE($3, processed_data),
                updated_at = NOW()
            WHERE id = $4 AND uploaded_by = $5 AND status = $6
            RETURNING {}
            "#,
            FILE_COLUMNS
        ))
        .bind(update.status)
        .bind(update.processing_error)
        .bind(update.processed_data.map(Json))
        .bind(id)
        .bind(owner)
        .bind(required)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(File::from))
    }
}
