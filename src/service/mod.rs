//! End-to-end load and benchmark phases over configured backends.
//!
//! Every phase owns its sessions: they are acquired at the start and
//! released on every exit path by [`ConnectionManager::scoped`].

use log::info;

use crate::backend::{Connector, MongoConnector, PostgresConnector, QueryParams, Session};
use crate::bench::{BenchmarkRunner, BenchmarkSuite};
use crate::conf::Config;
use crate::connection::{ConnectionManager, RetryPolicy, Sleeper, TokioSleeper};
use crate::core::{BackendSelection, BenchError, RunContext};
use crate::dataset::{Dataset, Record};
use crate::loader::{BulkLoader, LoadOutcome};
use crate::report::{BenchmarkReport, log_summary, write_report};

/// Final figures of one backend load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub outcome: LoadOutcome,
    pub stored: u64,
    pub elapsed_secs: f64,
}

impl LoadSummary {
    pub fn rate(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.outcome.inserted as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }
}

/// Reset the backend schema, bulk-load `records` and build indexes.
pub async fn load_backend<C, Z>(
    manager: &ConnectionManager<'_, Z>,
    connector: &C,
    loader: &BulkLoader<'_>,
    records: &[Record],
    ctx: &RunContext,
) -> Result<LoadSummary, BenchError>
where
    C: Connector,
    Z: Sleeper,
{
    let started = std::time::Instant::now();
    let (outcome, stored) = manager
        .scoped(connector, async |session: &mut C::Session| {
            session.reset().await?;
            info!(run_id = ctx.run_id(); "{} schema reset", connector.kind());
            let outcome = loader.load(session, records.iter().cloned()).await?;
            if outcome.inserted > 0 {
                session.finalize().await?;
                info!(run_id = ctx.run_id(); "{} indexes finalized", connector.kind());
            }
            let stored = session.count().await?;
            Ok((outcome, stored))
        })
        .await?;

    let summary = LoadSummary {
        outcome,
        stored,
        elapsed_secs: started.elapsed().as_secs_f64(),
    };
    info!(run_id = ctx.run_id(); "Import Summary ({}):", connector.kind());
    info!(run_id = ctx.run_id(); "Total time: {:.2} seconds", summary.elapsed_secs);
    info!(run_id = ctx.run_id(); "Records processed: {}", records.len());
    info!(run_id = ctx.run_id(); "Records inserted: {}", outcome.inserted);
    info!(run_id = ctx.run_id(); "Failed inserts: {}", outcome.failed);
    info!(run_id = ctx.run_id(); "Final row count: {}", stored);
    info!(
        run_id = ctx.run_id();
        "Average insertion rate: {:.2} records/second",
        summary.rate()
    );
    Ok(summary)
}

/// Open both backends and run the whole suite against them.
pub async fn benchmark<D, R, Z>(
    manager: &ConnectionManager<'_, Z>,
    document: &D,
    relational: &R,
    suite: &BenchmarkSuite<'_, Z>,
) -> Result<BenchmarkReport, BenchError>
where
    D: Connector,
    R: Connector,
    Z: Sleeper,
{
    manager
        .scoped(document, async |doc: &mut D::Session| {
            manager
                .scoped(relational, async |rel: &mut R::Session| suite.run(doc, rel).await)
                .await
        })
        .await
}

pub async fn run_load(config: &Config, selection: BackendSelection) -> Result<(), BenchError> {
    let ctx = RunContext::new("load");
    let dataset = Dataset::read(&config.load.dataset, &ctx)?;
    let manager = ConnectionManager::new(RetryPolicy::from(&config.retry), TokioSleeper, &ctx);
    let loader = BulkLoader::new(config.load.batch_size, &ctx)?
        .with_memory_sampling(config.load.memory_sample_every);

    if selection.includes_mongo() {
        let connector = MongoConnector::new(config.mongo.clone());
        load_backend(&manager, &connector, &loader, &dataset.records, &ctx).await?;
    }
    if selection.includes_postgres() {
        let connector = PostgresConnector::new(config.postgres.clone());
        load_backend(&manager, &connector, &loader, &dataset.records, &ctx).await?;
    }
    info!(run_id = ctx.run_id(); "Load finished in {:.2}s", ctx.elapsed_secs());
    Ok(())
}

pub async fn run_bench(config: &Config) -> Result<BenchmarkReport, BenchError> {
    let ctx = RunContext::new("bench");
    let manager = ConnectionManager::new(RetryPolicy::from(&config.retry), TokioSleeper, &ctx);
    let runner = BenchmarkRunner::new(
        config.bench.iterations,
        config.bench.cooldown,
        TokioSleeper,
        &ctx,
    )?
    .with_timeout(config.bench.operation_timeout);
    let suite = BenchmarkSuite::new(runner, QueryParams::from(&config.bench), &ctx);

    let document = MongoConnector::new(config.mongo.clone());
    let relational = PostgresConnector::new(config.postgres.clone());
    let report = benchmark(&manager, &document, &relational, &suite).await?;

    write_report(&report, &config.report.path)?;
    log_summary(&report, &ctx);
    info!(
        run_id = ctx.run_id();
        "Benchmark completed successfully, report written to {}",
        config.report.path.display()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate() {
        let summary = LoadSummary {
            outcome: LoadOutcome {
                inserted: 100,
                ..LoadOutcome::default()
            },
            stored: 100,
            elapsed_secs: 4.0,
        };
        assert_eq!(summary.rate(), 25.0);
    }
}
