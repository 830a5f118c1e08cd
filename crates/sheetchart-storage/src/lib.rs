//! SheetChart Storage Library
//!
//! This crate provides the storage abstraction used for uploaded spreadsheets
//! and a local filesystem implementation.
//!
//! # Storage key format
//!
//! Keys are flat generated filenames (`excel-{millis}-{random}.{ext}`) relative
//! to the backend root. Keys must not contain `..` or a leading `/`. Key
//! generation is centralized in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::generate_stored_filename;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use sheetchart_core::StorageBackend;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
