//! SheetChart Core Library
//!
//! This crate provides domain models, error types, configuration and shared
//! constants used across all SheetChart components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
