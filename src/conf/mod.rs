mod backend;
mod config;
mod harness;

pub use backend::{MongoConfig, PostgresConfig};
pub use config::Config;
pub use harness::{BenchConfig, LoadConfig, LoggingConfig, ReportConfig, RetryConfig};
