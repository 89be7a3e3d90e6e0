use std::fs::OpenOptions;
use std::path::Path;

use crate::core::BenchError;

/// Initialise the global logger. With a `file`, records are appended to it
/// instead of going to stderr.
pub fn setup_logging(file: Option<&Path>) -> Result<(), BenchError> {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_millis();

    if let Some(path) = file {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let sink = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(sink)));
    }

    builder
        .try_init()
        .map_err(|e| BenchError::ConfigParsingError(format!("logger already set: {e}")))
}
