use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::file::FileResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "chart_type", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Doughnut,
    Scatter,
    Area,
    Column,
}

impl ChartType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
            ChartType::Doughnut => "doughnut",
            ChartType::Scatter => "scatter",
            ChartType::Area => "area",
            ChartType::Column => "column",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    Category,
    Value,
    Time,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AxisConfig {
    pub field: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: AxisKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SeriesConfig {
    pub field: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub series_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    Contains,
    GreaterThan,
    LessThan,
    Between,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FilterPredicate {
    pub field: String,
    pub operator: FilterOperator,
    #[schema(value_type = Object)]
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Avg,
    Count,
    Max,
    Min,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

/// One rendered dataset (Chart.js shape).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<serde_json::Value>,
    pub background_color: String,
    pub border_color: String,
    pub border_width: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChartData {
    #[schema(value_type = Vec<Object>)]
    pub labels: Vec<serde_json::Value>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    pub x_axis: AxisConfig,
    pub y_axis: AxisConfig,
    #[validate(length(min = 1, message = "at least one series is required"))]
    pub series: Vec<SeriesConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<FilterPredicate>>,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortSpec>,
    #[validate(range(min = 1, message = "limit must be positive"))]
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ChartData>,
}

/// A chart definition owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chart {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub chart_type: ChartType,
    pub config: ChartConfig,
    pub source_file: Uuid,
    pub created_by: Uuid,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub view_count: i64,
    pub last_viewed: Option<DateTime<Utc>>,
    pub auto_generated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chart {
    pub fn from_new(id: Uuid, new: NewChart, now: DateTime<Utc>) -> Self {
        Chart {
            id,
            title: new.title,
            description: new.description,
            chart_type: new.chart_type,
            config: new.config,
            source_file: new.source_file,
            created_by: new.created_by,
            is_public: new.is_public,
            tags: new.tags,
            view_count: 0,
            last_viewed: None,
            auto_generated: new.auto_generated,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Values needed to insert a chart record.
#[derive(Debug, Clone)]
pub struct NewChart {
    pub title: String,
    pub description: Option<String>,
    pub chart_type: ChartType,
    pub config: ChartConfig,
    pub source_file: Uuid,
    pub created_by: Uuid,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub auto_generated: bool,
}

/// Body of `POST /charts`.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateChartRequest {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub chart_type: ChartType,
    #[validate(nested)]
    pub chart_config: ChartConfig,
    pub source_file: Uuid,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub tags: Vec<String>,
}

impl CreateChartRequest {
    pub fn into_new_chart(self, owner: Uuid) -> NewChart {
        NewChart {
            title: self.title.trim().to_string(),
            description: self.description,
            chart_type: self.chart_type,
            config: self.chart_config,
            source_file: self.source_file,
            created_by: owner,
            is_public: self.is_public,
            tags: self.tags,
            auto_generated: false,
        }
    }
}

/// `sourceFile` on the wire: a bare id, or the embedded file when resolved.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum SourceFileRef {
    Populated(Box<FileResponse>),
    Id(Uuid),
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChartResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub chart_type: ChartType,
    pub chart_config: ChartConfig,
    /// `null` when the referenced file no longer exists.
    pub source_file: Option<SourceFileRef>,
    pub created_by: Uuid,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub view_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_viewed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChartResponse {
    /// Replace the bare source id with the resolved file, or `null` if it is gone.
    pub fn with_source(mut self, file: Option<FileResponse>) -> Self {
        self.source_file = file.map(|f| SourceFileRef::Populated(Box::new(f)));
        self
    }
}

impl From<Chart> for ChartResponse {
    fn from(chart: Chart) -> Self {
        ChartResponse {
            id: chart.id,
            title: chart.title,
            description: chart.description,
            chart_type: chart.chart_type,
            chart_config: chart.config,
            source_file: Some(SourceFileRef::Id(chart.source_file)),
            created_by: chart.created_by,
            is_public: chart.is_public,
            tags: chart.tags,
            view_count: chart.view_count,
            last_viewed: chart.last_viewed,
            created_at: chart.created_at,
            updated_at: chart.updated_at,
        }
    }
}

/// Body of `POST /charts/autogen` responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AutogenResponse {
    pub message: String,
    pub created: usize,
}
