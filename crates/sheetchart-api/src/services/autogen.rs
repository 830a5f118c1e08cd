//! Batch chart generation over a caller's uploaded workbooks.

use std::sync::Arc;

use sheetchart_core::constants::is_spreadsheet_content_type;
use sheetchart_core::models::File;
use sheetchart_core::AppError;
use sheetchart_db::{ChartStore, FileStore};
use sheetchart_processing::{infer_chart, read_first_worksheet};
use sheetchart_storage::Storage;
use uuid::Uuid;

use crate::state::AppState;

/// Per-run counts. Only `created` is reported to the client.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AutogenOutcome {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum FileResult {
    Created,
    Skipped,
}

pub struct ChartAutogenService {
    files: Arc<dyn FileStore>,
    charts: Arc<dyn ChartStore>,
    storage: Arc<dyn Storage>,
}

impl ChartAutogenService {
    pub fn new(state: &AppState) -> Self {
        Self {
            files: state.files.clone(),
            charts: state.charts.clone(),
            storage: state.storage.clone(),
        }
    }

    /// Try every spreadsheet the owner has uploaded. Only listing the files can
    /// fail the run; per-file problems are logged and skipped.
    pub async fn run(&self, owner: Uuid) -> Result<AutogenOutcome, AppError> {
        let files = self.files.list_files(owner).await?;
        let mut outcome = AutogenOutcome::default();

        for file in files
            .iter()
            .filter(|f| is_spreadsheet_content_type(&f.mimetype))
        {
            match self.generate_for(owner, file).await {
                Ok(FileResult::Created) => outcome.created += 1,
                Ok(FileResult::Skipped) => outcome.skipped += 1,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        file_id = %file.id,
                        user_id = %owner,
                        "Skipping file during chart generation"
                    );
                    outcome.failed += 1;
                }
            }
        }

        tracing::info!(
            user_id = %owner,
            created = outcome.created,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "Chart generation finished"
        );

        Ok(outcome)
    }

    async fn generate_for(&self, owner: Uuid, file: &File) -> Result<FileResult, AppError> {
        if self.charts.exists_for_file(owner, file.id).await? {
            return Ok(FileResult::Skipped);
        }

        let bytes = self
            .storage
            .download(file.storage_key())
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let sheet = tokio::task::spawn_blocking(move || read_first_worksheet(&bytes))
            .await
            .map_err(|e| AppError::Internal(format!("Workbook parser task failed: {}", e)))?
            .map_err(|e| AppError::Spreadsheet(e.to_string()))?;

        let Some(new_chart) = infer_chart(&sheet, file) else {
            tracing::debug!(file_id = %file.id, "Worksheet has no data rows");
            return Ok(FileResult::Skipped);
        };

        match self.charts.insert_autogenerated(new_chart).await? {
            Some(chart) => {
                tracing::debug!(file_id = %file.id, chart_id = %chart.id, "Chart generated");
                Ok(FileResult::Created)
            }
            None => Ok(FileResult::Skipped),
        }
    }
}
