//! SheetChart HTTP API.
//!
//! Authenticated users upload Excel workbooks, download them, have them
//! summarized, and create charts from them, either by hand or with the
//! auto-generation heuristic.

pub mod api_doc;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod services;
pub mod setup;
pub mod state;
pub mod telemetry;
