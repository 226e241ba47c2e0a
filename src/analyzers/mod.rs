//! Summary reports over the durable dataset.
//!
//! Every run recomputes the reports from the full dataset and overwrites the
//! previous files; no history is kept.

pub mod aggregate;
pub mod report;
pub mod types;
pub mod utility;

pub use aggregate::aggregate;
pub use report::write_reports;
pub use types::SummaryReport;
