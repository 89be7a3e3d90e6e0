use log::info;

use crate::backend::{QueryClass, QueryParams, Session};
use crate::connection::Sleeper;
use crate::core::{BenchError, RunContext};
use crate::report::{BenchmarkReport, CategoryResults, TestResult};

use super::{BenchmarkRunner, QueryResult};

/// Runs every query class against a document and a relational session and
/// assembles the report.
pub struct BenchmarkSuite<'a, Z: Sleeper> {
    runner: BenchmarkRunner<'a, Z>,
    params: QueryParams,
    classes: Vec<QueryClass>,
    ctx: &'a RunContext,
}

impl<'a, Z: Sleeper> BenchmarkSuite<'a, Z> {
    pub fn new(runner: BenchmarkRunner<'a, Z>, params: QueryParams, ctx: &'a RunContext) -> Self {
        Self {
            runner,
            params,
            classes: QueryClass::ALL.to_vec(),
            ctx,
        }
    }

    /// Restrict the suite to a subset of query classes, kept in the given order.
    pub fn with_classes(mut self, classes: &[QueryClass]) -> Self {
        self.classes = classes.to_vec();
        self
    }

    pub async fn run<D, R>(&self, document: &mut D, relational: &mut R) -> Result<BenchmarkReport, BenchError>
    where
        D: Session + ?Sized,
        R: Session + ?Sized,
    {
        let mut categories = Vec::with_capacity(self.classes.len());
        for &class in &self.classes {
            info!(run_id = self.ctx.run_id(); "Benchmarking {}", class.category());
            let tests = vec![
                self.measure(document, class).await?,
                self.measure(relational, class).await?,
            ];
            categories.push(CategoryResults {
                name: class.category().to_string(),
                tests,
            });
        }
        Ok(BenchmarkReport::new(self.runner.iterations(), categories, self.ctx))
    }

    async fn measure<S>(&self, session: &mut S, class: QueryClass) -> Result<TestResult, BenchError>
    where
        S: Session + ?Sized,
    {
        let backend = session.kind();
        let name = class.test_name(backend);
        let params = &self.params;
        let samples = self
            .runner
            .run(name, async || session.execute(class, params).await)
            .await?;
        Ok(TestResult {
            name: name.to_string(),
            backend,
            result: QueryResult::from_timings(&samples)?,
        })
    }
}
