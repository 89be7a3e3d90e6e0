use std::time::Duration;

use thiserror::Error;

/// Failure reported by a backend driver, classified so callers can react
/// to the cause (e.g. retry a timeout but not a bad password).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("write rejected: {0}")]
    Rejected(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    pub fn timeout_after(limit: Duration) -> Self {
        BackendError::Timeout(format!("operation exceeded {:.3}s", limit.as_secs_f64()))
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BenchError {
    #[error("Cannot parse config: {0}")]
    ConfigParsingError(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Dataset error: {0}")]
    DatasetError(String),
    #[error("Report error: {0}")]
    ReportError(String),
    #[error("Cannot connect to {target} after {attempts} attempts: {cause}")]
    Connection {
        target: String,
        attempts: u32,
        #[source]
        cause: BackendError,
    },
    #[error("Batch {batch} could not be written: {cause}")]
    BatchFatal {
        batch: usize,
        #[source]
        cause: BackendError,
    },
    #[error("Operation '{name}' failed on iteration {iteration}: {cause}")]
    Operation {
        name: String,
        iteration: usize,
        #[source]
        cause: BackendError,
    },
    #[error("Cannot summarize an empty sample set")]
    InsufficientData,
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl From<std::io::Error> for BenchError {
    fn from(err: std::io::Error) -> Self {
        BenchError::IoError(err.to_string())
    }
}

impl From<csv::Error> for BenchError {
    fn from(err: csv::Error) -> Self {
        BenchError::DatasetError(err.to_string())
    }
}

impl From<serde_json::Error> for BenchError {
    fn from(err: serde_json::Error) -> Self {
        BenchError::ReportError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_keeps_cause() {
        let err = BenchError::Connection {
            target: "mongodb://localhost:27017/".to_string(),
            attempts: 3,
            cause: BackendError::Auth("bad password".to_string()),
        };
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "authentication failed: bad password");
        assert!(err.to_string().contains("after 3 attempts"));
    }

    #[test]
    fn test_timeout_message() {
        let err = BackendError::timeout_after(Duration::from_millis(1500));
        assert_eq!(err, BackendError::Timeout("operation exceeded 1.500s".to_string()));
    }
}
