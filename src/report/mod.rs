//! Benchmark results, cross-backend findings and report persistence.

mod compare;
mod report;
mod writer;

pub use compare::{FINDING_THRESHOLD_PERCENT, Finding, compare, diff_percent};
pub use report::{BenchmarkReport, CategoryResults, TestResult};
pub use writer::{log_summary, write_report};
