use std::time::{Duration, Instant};

use log::info;

use crate::connection::Sleeper;
use crate::core::{BackendError, BenchError, RunContext};

/// Wall-clock duration of one execution of one operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingSample {
    /// 1-based iteration number.
    pub iteration: usize,
    pub elapsed: Duration,
}

impl TimingSample {
    pub fn seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Times repeated executions of an operation, one at a time.
pub struct BenchmarkRunner<'a, Z: Sleeper> {
    iterations: usize,
    cooldown: Duration,
    timeout: Option<Duration>,
    sleeper: Z,
    ctx: &'a RunContext,
}

impl<'a, Z: Sleeper> BenchmarkRunner<'a, Z> {
    pub fn new(
        iterations: usize,
        cooldown: Duration,
        sleeper: Z,
        ctx: &'a RunContext,
    ) -> Result<Self, BenchError> {
        if iterations == 0 {
            return Err(BenchError::InvalidArgument(
                "iterations must be a positive integer".into(),
            ));
        }
        Ok(Self {
            iterations,
            cooldown,
            timeout: None,
            sleeper,
            ctx,
        })
    }

    /// Fail an iteration that runs longer than `limit`.
    pub fn with_timeout(mut self, limit: Option<Duration>) -> Self {
        self.timeout = limit;
        self
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Execute `operation` `iterations` times, waiting `cooldown` between
    /// runs. Samples come back in iteration order. Any failure aborts the
    /// run and no samples are returned.
    pub async fn run<F, T>(&self, name: &str, mut operation: F) -> Result<Vec<TimingSample>, BenchError>
    where
        F: AsyncFnMut() -> Result<T, BackendError>,
    {
        let mut samples = Vec::with_capacity(self.iterations);
        for iteration in 1..=self.iterations {
            if iteration > 1 && !self.cooldown.is_zero() {
                self.sleeper.sleep(self.cooldown).await;
            }
            info!(
                run_id = self.ctx.run_id();
                "Running {} - Iteration {}/{}",
                name,
                iteration,
                self.iterations
            );

            let start = Instant::now();
            let outcome = match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, operation()).await {
                    Ok(result) => result,
                    Err(_) => Err(BackendError::timeout_after(limit)),
                },
                None => operation().await,
            };
            let elapsed = start.elapsed();

            if let Err(cause) = outcome {
                return Err(BenchError::Operation {
                    name: name.to_string(),
                    iteration,
                    cause,
                });
            }
            info!(
                run_id = self.ctx.run_id();
                "{} iteration {} took {:.4}s",
                name,
                iteration,
                elapsed.as_secs_f64()
            );
            samples.push(TimingSample { iteration, elapsed });
        }
        Ok(samples)
    }
}
