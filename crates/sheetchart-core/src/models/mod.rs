//! Data models for the application
//!
//! Domain records (`File`, `Chart`) are kept separate from their wire
//! representations (`FileResponse`, `ChartResponse`).

mod chart;
mod file;

pub use chart::*;
pub use file::*;
