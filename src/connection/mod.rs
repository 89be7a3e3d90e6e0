//! Backend session acquisition with retry/backoff and scoped release.

mod manager;
mod retry;
mod sleeper;

pub use manager::ConnectionManager;
pub use retry::RetryPolicy;
pub use sleeper::{Sleeper, TokioSleeper};
