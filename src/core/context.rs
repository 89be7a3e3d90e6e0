use chrono::{DateTime, Local};
use log::kv::{ToValue, Value};

/// Per-invocation context handed to every component of a load or benchmark
/// run. Its `run_id` tags the log records emitted on behalf of the run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    run_id: String,
    started_at: DateTime<Local>,
}

impl RunContext {
    pub fn new(phase: &str) -> Self {
        let started_at = Local::now();
        Self {
            run_id: format!("{}-{}", phase, started_at.format("%Y%m%dT%H%M%S%.3f")),
            started_at,
        }
    }

    pub fn with_id(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Local::now(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Seconds elapsed since the run started.
    pub fn elapsed_secs(&self) -> f64 {
        let elapsed = Local::now() - self.started_at;
        elapsed.num_milliseconds() as f64 / 1000.0
    }
}

impl ToValue for RunContext {
    fn to_value(&self) -> Value<'_> {
        Value::from(self.run_id.as_str())
    }
}
