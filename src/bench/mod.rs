//! Repeated, timed query execution reduced to comparable statistics.

mod runner;
mod stats;
mod suite;

pub use runner::{BenchmarkRunner, TimingSample};
pub use stats::QueryResult;
pub use suite::BenchmarkSuite;
