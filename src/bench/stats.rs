use serde::{Deserialize, Serialize};

use crate::core::BenchError;

use super::TimingSample;

/// Summary statistics over the timings of one (operation, backend) pair.
/// All values are in seconds; `samples` keeps iteration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    #[serde(rename = "all_iterations")]
    pub samples: Vec<f64>,
}

impl QueryResult {
    /// Reduce raw samples. `std_dev` is the sample standard deviation, or
    /// 0 for a single sample.
    pub fn summarize(samples: &[f64]) -> Result<QueryResult, BenchError> {
        if samples.is_empty() {
            return Err(BenchError::InsufficientData);
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        let std_dev = if samples.len() < 2 {
            0.0
        } else {
            let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1.0);
            var.sqrt()
        };

        Ok(QueryResult {
            mean,
            median,
            std_dev,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            samples: samples.to_vec(),
        })
    }

    pub fn from_timings(timings: &[TimingSample]) -> Result<QueryResult, BenchError> {
        let samples: Vec<f64> = timings.iter().map(TimingSample::seconds).collect();
        Self::summarize(&samples)
    }
}
