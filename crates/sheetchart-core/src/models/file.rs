use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Processing state of an uploaded spreadsheet.
///
/// Moves `uploading -> processing -> {completed | error}` and never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "file_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Uploading,
    Processing,
    Completed,
    Error,
}

impl FileStatus {
    /// The only state a file may be in right before entering `self`.
    pub fn predecessor(self) -> Option<FileStatus> {
        match self {
            FileStatus::Uploading => None,
            FileStatus::Processing => Some(FileStatus::Uploading),
            FileStatus::Completed | FileStatus::Error => Some(FileStatus::Processing),
        }
    }

    pub fn can_transition_to(self, next: FileStatus) -> bool {
        next.predecessor() == Some(self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Uploading => "uploading",
            FileStatus::Processing => "processing",
            FileStatus::Completed => "completed",
            FileStatus::Error => "error",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uploading" => Ok(FileStatus::Uploading),
            "processing" => Ok(FileStatus::Processing),
            "completed" => Ok(FileStatus::Completed),
            "error" => Ok(FileStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid file status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SheetSummary {
    pub name: String,
    pub headers: Vec<String>,
    pub row_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedMetadata {
    pub has_headers: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<DateTime<Utc>>,
}

/// Summary of a workbook's contents, stored alongside the file record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedData {
    /// Header row of the first sheet.
    pub headers: Vec<String>,
    /// Data rows (excluding the header) of the first sheet.
    pub row_count: u64,
    pub sheets: Vec<SheetSummary>,
    #[schema(value_type = Vec<Object>)]
    pub data_preview: Vec<serde_json::Value>,
    pub metadata: ProcessedMetadata,
}

/// An uploaded spreadsheet owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    pub id: Uuid,
    pub filename: String,
    pub original_name: String,
    pub mimetype: String,
    pub size: i64,
    pub path: String,
    pub uploaded_by: Uuid,
    pub status: FileStatus,
    pub processing_error: Option<String>,
    pub processed_data: Option<ProcessedData>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub is_public: bool,
    pub download_count: i64,
    pub last_accessed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl File {
    pub fn storage_key(&self) -> &str {
        &self.path
    }

    /// Build the record for a freshly stored upload.
    pub fn from_new(id: Uuid, new: NewFile, now: DateTime<Utc>) -> Self {
        File {
            id,
            filename: new.filename,
            original_name: new.original_name,
            mimetype: new.mimetype,
            size: new.size,
            path: new.path,
            uploaded_by: new.uploaded_by,
            status: FileStatus::Uploading,
            processing_error: None,
            processed_data: None,
            tags: Vec::new(),
            description: None,
            is_public: false,
            download_count: 0,
            last_accessed: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Values needed to insert a file record.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub filename: String,
    pub original_name: String,
    pub mimetype: String,
    pub size: i64,
    pub path: String,
    pub uploaded_by: Uuid,
}

/// A status change applied by the processing path.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: FileStatus,
    pub processing_error: Option<String>,
    pub processed_data: Option<ProcessedData>,
}

impl StatusUpdate {
    pub fn to(status: FileStatus) -> Self {
        StatusUpdate {
            status,
            processing_error: None,
            processed_data: None,
        }
    }

    pub fn completed(data: ProcessedData) -> Self {
        StatusUpdate {
            status: FileStatus::Completed,
            processing_error: None,
            processed_data: Some(data),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        StatusUpdate {
            status: FileStatus::Error,
            processing_error: Some(message.into()),
            processed_data: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub filename: String,
    pub original_name: String,
    pub mimetype: String,
    pub size: i64,
    pub path: String,
    pub uploaded_by: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_data: Option<ProcessedData>,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_error: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_public: bool,
    pub download_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<File> for FileResponse {
    fn from(file: File) -> Self {
        FileResponse {
            id: file.id,
            filename: file.filename,
            original_name: file.original_name,
            mimetype: file.mimetype,
            size: file.size,
            path: file.path,
            uploaded_by: file.uploaded_by,
            processed_data: file.processed_data,
            status: file.status,
            processing_error: file.processing_error,
            tags: file.tags,
            description: file.description,
            is_public: file.is_public,
            download_count: file.download_count,
            last_accessed: file.last_accessed,
            created_at: file.created_at,
            updated_at: file.updated_at,
        }
    }
}
