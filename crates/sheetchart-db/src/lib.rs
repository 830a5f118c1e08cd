//! Persistence for SheetChart files and charts.
//!
//! Exposes the [`FileStore`] and [`ChartStore`] seams with a PostgreSQL
//! implementation and an in-memory one for local runs and tests.

pub mod db;

pub use db::{ChartRepository, ChartStore, FileRepository, FileStore, MemoryStore};
