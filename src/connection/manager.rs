use log::{error, info, warn};

use crate::backend::{Connector, Session};
use crate::core::{BenchError, RunContext};

use super::{RetryPolicy, Sleeper};

/// Opens backend sessions with bounded retries.
pub struct ConnectionManager<'a, Z: Sleeper> {
    policy: RetryPolicy,
    sleeper: Z,
    ctx: &'a RunContext,
}

impl<'a, Z: Sleeper> ConnectionManager<'a, Z> {
    pub fn new(policy: RetryPolicy, sleeper: Z, ctx: &'a RunContext) -> Self {
        Self {
            policy,
            sleeper,
            ctx,
        }
    }

    /// Connect, retrying with backoff. After the last attempt the driver's
    /// own error is returned as the cause.
    pub async fn acquire<C: Connector>(&self, connector: &C) -> Result<C::Session, BenchError> {
        let target = connector.target();
        let max_attempts = self.policy.max_attempts;
        let mut attempt = 0;
        loop {
            info!(
                run_id = self.ctx.run_id();
                "Connecting to {} {} (attempt {}/{})",
                connector.kind(),
                target,
                attempt + 1,
                max_attempts
            );
            match connector.connect().await {
                Ok(session) => {
                    info!(run_id = self.ctx.run_id(); "Successfully connected to {}", target);
                    return Ok(session);
                }
                Err(cause) => {
                    error!(
                        run_id = self.ctx.run_id();
                        "Connection attempt {} failed: {}",
                        attempt + 1,
                        cause
                    );
                    if attempt + 1 >= max_attempts {
                        return Err(BenchError::Connection {
                            target,
                            attempts: max_attempts,
                            cause,
                        });
                    }
                    let delay = self.policy.delay_for(attempt);
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Acquire a session, run `body` with it and close it exactly once on
    /// every exit path. A failure of `body` wins over a failure to close.
    pub async fn scoped<C, T, F>(&self, connector: &C, body: F) -> Result<T, BenchError>
    where
        C: Connector,
        F: AsyncFnOnce(&mut C::Session) -> Result<T, BenchError>,
    {
        let mut session = self.acquire(connector).await?;
        let result = body(&mut session).await;
        let closed = session.close().await;

        match (result, closed) {
            (Ok(value), Ok(())) => {
                info!(run_id = self.ctx.run_id(); "Closed session to {}", connector.target());
                Ok(value)
            }
            (Ok(_), Err(e)) => Err(BenchError::Backend(e)),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    warn!(
                        run_id = self.ctx.run_id();
                        "Closing {} after failure also failed: {}",
                        connector.target(),
                        close_err
                    );
                }
                Err(e)
            }
        }
    }
}
