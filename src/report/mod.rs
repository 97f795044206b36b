pub mod generator;
pub mod stats;

pub use generator::export_report;
pub use stats::{build_report, Report};
