use sheetchart_core::constants::{
    is_spreadsheet_content_type, ALLOWED_CONTENT_TYPES, ALLOWED_EXTENSIONS,
};
use std::path::Path;

/// Rejections for an uploaded spreadsheet.
#[derive(Debug, thiserror::Error)]
pub enum UploadValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("File name has no extension: {0}")]
    MissingExtension(String),

    #[error("Empty file")]
    EmptyFile,
}

/// Upload checks for spreadsheet files.
///
/// Extension and declared MIME type are checked independently; they are not
/// required to agree with each other.
pub struct UploadValidator {
    max_file_size: usize,
    allowed_extensions: Vec<String>,
}

impl UploadValidator {
    pub fn new(max_file_size: usize) -> Self {
        Self {
            max_file_size,
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn validate_file_size(&self, size: usize) -> Result<(), UploadValidationError> {
        if size == 0 {
            return Err(UploadValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(UploadValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Returns the lowercased extension on success.
    pub fn validate_extension(&self, filename: &str) -> Result<String, UploadValidationError> {
        let extension = file_extension(filename)
            .ok_or_else(|| UploadValidationError::MissingExtension(filename.to_string()))?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(UploadValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(extension)
    }

    pub fn validate_content_type(&self, content_type: &str) -> Result<(), UploadValidationError> {
        if !is_spreadsheet_content_type(content_type) {
            return Err(UploadValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: ALLOWED_CONTENT_TYPES.iter().map(|c| c.to_string()).collect(),
            });
        }

        Ok(())
    }
}

/// Lowercased extension of a (possibly untrusted) file name.
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_lowercase())
}
