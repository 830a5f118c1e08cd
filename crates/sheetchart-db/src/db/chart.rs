use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sheetchart_core::models::{Chart, ChartConfig, ChartType, NewChart};
use sheetchart_core::AppError;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::store::ChartStore;

const CHART_COLUMNS: &str = "id, title, description, chart_type, config, source_file_id, \
     created_by, is_public, tags, view_count, last_viewed, auto_generated, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ChartRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    chart_type: ChartType,
    config: Json<ChartConfig>,
    source_file_id: Uuid,
    created_by: Uuid,
    is_public: bool,
    tags: Vec<String>,
    view_count: i64,
    last_viewed: Option<DateTime<Utc>>,
    auto_generated: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ChartRow> for Chart {
    fn from(row: ChartRow) -> Self {
        Chart {
            id: row.id,
            title: row.title,
            description: row.description,
            chart_type: row.chart_type,
            config: row.config.0,
            source_file: row.source_file_id,
            created_by: row.created_by,
            is_public: row.is_public,
            tags: row.tags,
            view_count: row.view_count,
            last_viewed: row.last_viewed,
            auto_generated: row.auto_generated,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL-backed chart records.
#[derive(Clone)]
pub struct ChartRepository {
    pool: PgPool,
}

impl ChartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Shared INSERT; `on_conflict` is appended verbatim before RETURNING.
    async fn insert(&self, new: NewChart, on_conflict: &str) -> Result<Option<Chart>, AppError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let row = sqlx::query_as::<Postgres, ChartRow>(&format!(
            r#"
            INSERT INTO charts (
                id, title, description, chart_type, config, source_file_id, created_by,
                is_public, tags, auto_generated, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            {}
            RETURNING {}
            "#,
            on_conflict, CHART_COLUMNS
        ))
        .bind(id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.chart_type)
        .bind(Json(&new.config))
        .bind(new.source_file)
        .bind(new.created_by)
        .bind(new.is_public)
        .bind(&new.tags)
        .bind(new.auto_generated)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(
                error = ?e,
                source_file = %new.source_file,
                "Failed to insert chart record"
            );
            AppError::Database(e)
        })?;

        Ok(row.map(Chart::from))
    }
}

#[async_trait]
impl ChartStore for ChartRepository {
    #[tracing::instrument(skip(self, new), fields(db.table = "charts", db.operation = "insert", user_id = %new.created_by))]
    async fn create_chart(&self, new: NewChart) -> Result<Chart, AppError> {
        self.insert(new, "")
            .await?
            .ok_or_else(|| AppError::Internal("Chart insert returned no row".to_string()))
    }

    #[tracing::instrument(skip(self, new), fields(db.table = "charts", db.operation = "insert", source_file = %new.source_file))]
    async fn insert_autogenerated(&self, new: NewChart) -> Result<Option<Chart>, AppError> {
        self.insert(
            new,
            "ON CONFLICT (source_file_id, created_by) WHERE auto_generated DO NOTHING",
        )
        .await
    }

    #[tracing::instrument(skip(self), fields(db.table = "charts", db.operation = "select", source_file = %file_id))]
    async fn exists_for_file(&self, owner: Uuid, file_id: Uuid) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS(SELECT 1 FROM charts WHERE source_file_id = $1 AND created_by = $2)",
        )
        .bind(file_id)
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    #[tracing::instrument(skip(self), fields(db.table = "charts", db.operation = "select"))]
    async fn list_charts(&self, owner: Uuid) -> Result<Vec<Chart>, AppError> {
        let rows = sqlx::query_as::<Postgres, ChartRow>(&format!(
            "SELECT {} FROM charts WHERE created_by = $1 ORDER BY created_at DESC, id DESC",
            CHART_COLUMNS
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Chart::from).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "charts", db.operation = "update", db.record_id = %id))]
    async fn record_view(&self, owner: Uuid, id: Uuid) -> Result<Option<Chart>, AppError> {
        let row = sqlx::query_as::<Postgres, ChartRow>(&format!(
            r#"
            UPDATE charts
            SET view_count = view_count + 1, last_viewed = NOW()
            WHERE id = $1 AND created_by = $2
            RETURNING {}
            "#,
            CHART_COLUMNS
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Chart::from))
    }
}
