use std::fmt;

use log::warn;

use crate::backend::BackendKind;
use crate::core::RunContext;

use super::CategoryResults;

/// Differences at or below this many percent are treated as noise.
pub const FINDING_THRESHOLD_PERCENT: f64 = 10.0;

/// A threshold-significant difference between the two stores on
/// equivalent operations.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub category: String,
    pub document_test: String,
    pub relational_test: String,
    /// `(mean_document - mean_relational) / mean_relational * 100`.
    pub diff_percent: f64,
}

impl Finding {
    pub fn faster(&self) -> BackendKind {
        if self.diff_percent < 0.0 {
            BackendKind::Document
        } else {
            BackendKind::Relational
        }
    }

    pub fn magnitude(&self) -> f64 {
        self.diff_percent.abs()
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "In {}, {} was {:.1}% faster on average ({} vs {})",
            self.category,
            self.faster(),
            self.magnitude(),
            self.document_test,
            self.relational_test
        )
    }
}

/// Relative difference of `a` against `b`, in percent. `None` when `b` is 0.
pub fn diff_percent(mean_a: f64, mean_b: f64) -> Option<f64> {
    if mean_b == 0.0 || !mean_b.is_finite() || !mean_a.is_finite() {
        return None;
    }
    Some((mean_a - mean_b) / mean_b * 100.0)
}

/// Pair every document-store test with every relational test of the same
/// category and keep the pairs differing by more than the threshold.
pub fn compare(categories: &[CategoryResults], ctx: &RunContext) -> Vec<Finding> {
    let mut findings = Vec::new();
    for category in categories {
        let documents = category
            .tests
            .iter()
            .filter(|t| t.backend == BackendKind::Document);
        for doc in documents {
            let relationals = category
                .tests
                .iter()
                .filter(|t| t.backend == BackendKind::Relational);
            for rel in relationals {
                let Some(diff) = diff_percent(doc.result.mean, rel.result.mean) else {
                    warn!(
                        run_id = ctx.run_id();
                        "Skipping {} vs {}: relational mean is zero",
                        doc.name, rel.name
                    );
                    continue;
                };
                if diff.abs() > FINDING_THRESHOLD_PERCENT {
                    findings.push(Finding {
                        category: category.name.clone(),
                        document_test: doc.name.clone(),
                        relational_test: rel.name.clone(),
                        diff_percent: diff,
                    });
                }
            }
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::bench::QueryResult;
    use crate::report::TestResult;

    fn ctx() -> RunContext {
        RunContext::with_id("test")
    }

    fn test(name: &str, backend: BackendKind, mean: f64) -> TestResult {
        TestResult {
            name: name.to_string(),
            backend,
            result: QueryResult::summarize(&[mean]).unwrap(),
        }
    }

    fn category(doc_mean: f64, rel_mean: f64) -> CategoryResults {
        CategoryResults {
            name: "simple_queries".to_string(),
            tests: vec![
                test("mongodb_find", BackendKind::Document, doc_mean),
                test("postgres_select", BackendKind::Relational, rel_mean),
            ],
        }
    }

    #[test]
    fn test_document_faster_by_twenty_percent() {
        let findings = compare(&[category(0.080, 0.100)], &ctx());
        assert_eq!(findings.len(), 1);
        let finding = &findings[0];
        assert_eq!(finding.faster(), BackendKind::Document);
        assert!((finding.magnitude() - 20.0).abs() < 1e-9);
        assert_eq!(
            finding.to_string(),
            "In simple_queries, MongoDB was 20.0% faster on average (mongodb_find vs postgres_select)"
        );
    }

    #[test]
    fn test_relational_faster() {
        let findings = compare(&[category(0.150, 0.100)], &ctx());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].faster(), BackendKind::Relational);
        assert!(findings[0].to_string().contains("PostgreSQL was 50.0% faster"));
    }

    #[rstest]
    #[case::two_percent(0.098, 0.100)]
    #[case::just_under_ten(0.1095, 0.100)]
    #[case::equal(0.100, 0.100)]
    #[case::zero_baseline(0.100, 0.0)]
    fn test_no_finding(#[case] doc_mean: f64, #[case] rel_mean: f64) {
        assert!(compare(&[category(doc_mean, rel_mean)], &ctx()).is_empty());
    }

    #[test]
    fn test_pairs_only_within_category() {
        let mut a = category(0.05, 0.10);
        a.tests.pop();
        let mut b = category(0.05, 0.10);
        b.name = "joins".to_string();
        b.tests.remove(0);
        assert!(compare(&[a, b], &ctx()).is_empty());
    }
}
