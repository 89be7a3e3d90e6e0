use chrono::{Local, NaiveDateTime};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::backend::BackendKind;
use crate::bench::QueryResult;
use crate::core::RunContext;

use super::{Finding, compare};

/// One measured test: a named query on one backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TestResult {
    pub name: String,
    pub backend: BackendKind,
    pub result: QueryResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryResults {
    pub name: String,
    pub tests: Vec<TestResult>,
}

/// Results of a complete benchmark run, with findings derived at
/// construction. Categories and tests keep their run order.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkReport {
    timestamp: NaiveDateTime,
    iterations: usize,
    categories: Vec<CategoryResults>,
    findings: Vec<Finding>,
}

impl BenchmarkReport {
    pub fn new(iterations: usize, categories: Vec<CategoryResults>, ctx: &RunContext) -> Self {
        let findings = compare(&categories, ctx);
        Self {
            timestamp: Local::now().naive_local(),
            iterations,
            categories,
            findings,
        }
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn categories(&self) -> &[CategoryResults] {
        &self.categories
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn category(&self, name: &str) -> Option<&CategoryResults> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn test(&self, category: &str, test: &str) -> Option<&QueryResult> {
        self.category(category)?
            .tests
            .iter()
            .find(|t| t.name == test)
            .map(|t| &t.result)
    }

    pub fn total_queries(&self) -> usize {
        self.categories.iter().map(|c| c.tests.len()).sum()
    }
}

#[derive(Serialize)]
struct Summary<'a> {
    test_categories: Vec<&'a str>,
    total_queries_executed: usize,
    iterations_per_query: usize,
    overall_findings: Vec<String>,
}

struct Detailed<'a>(&'a [CategoryResults]);

struct Tests<'a>(&'a [TestResult]);

impl Serialize for Detailed<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for category in self.0 {
            map.serialize_entry(&category.name, &Tests(&category.tests))?;
        }
        map.end()
    }
}

impl Serialize for Tests<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for test in self.0 {
            map.serialize_entry(&test.name, &test.result)?;
        }
        map.end()
    }
}

impl Serialize for BenchmarkReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let summary = Summary {
            test_categories: self.categories.iter().map(|c| c.name.as_str()).collect(),
            total_queries_executed: self.total_queries(),
            iterations_per_query: self.iterations,
            overall_findings: self.findings.iter().map(Finding::to_string).collect(),
        };
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry(
            "timestamp",
            &self.timestamp.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        )?;
        map.serialize_entry("summary", &summary)?;
        map.serialize_entry("detailed_results", &Detailed(&self.categories))?;
        map.end()
    }
}
