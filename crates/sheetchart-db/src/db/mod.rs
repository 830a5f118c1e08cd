//! Database repositories for data access layer
//
// Store traits shared by every backend
pub mod store;
//
// PostgreSQL repositories
pub mod chart;
pub mod file;
//
// In-process backend
pub mod memory;

pub use chart::ChartRepository;
pub use file::FileRepository;
pub use memory::MemoryStore;
pub use store::{ChartStore, FileStore};
