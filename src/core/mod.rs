mod args;
mod context;
mod error;
mod logger;

pub use args::{BackendSelection, CliArgs, Command};
pub use context::RunContext;
pub use error::{BackendError, BenchError};
pub use logger::setup_logging;
