pub mod autogen;
pub mod processing;
pub mod upload;

pub use autogen::{AutogenOutcome, ChartAutogenService};
pub use processing::process_file;
pub use upload::{SpreadsheetUpload, UploadService};
