use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    #[serde(default = "RetryConfig::default_max_attempts")]
    pub max_attempts: u32,
    #[serde(with = "humantime_serde", default = "RetryConfig::default_base_delay")]
    pub base_delay: Duration,
    #[serde(default = "RetryConfig::default_multiplier")]
    pub multiplier: f64,
}

impl RetryConfig {
    fn default_max_attempts() -> u32 {
        3
    }

    fn default_base_delay() -> Duration {
        Duration::from_secs(1)
    }

    fn default_multiplier() -> f64 {
        2.0
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            base_delay: Self::default_base_delay(),
            multiplier: Self::default_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoadConfig {
    #[serde(default = "LoadConfig::default_dataset")]
    pub dataset: PathBuf,
    #[serde(default = "LoadConfig::default_batch_size")]
    pub batch_size: usize,
    /// Sample process memory every this many batches.
    #[serde(default = "LoadConfig::default_memory_sample_every")]
    pub memory_sample_every: usize,
}

impl LoadConfig {
    fn default_dataset() -> PathBuf {
        PathBuf::from("./data/sentiment_analysis_results_improved.csv")
    }

    fn default_batch_size() -> usize {
        5000
    }

    fn default_memory_sample_every() -> usize {
        10
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            dataset: Self::default_dataset(),
            batch_size: Self::default_batch_size(),
            memory_sample_every: Self::default_memory_sample_every(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BenchConfig {
    #[serde(default = "BenchConfig::default_iterations")]
    pub iterations: usize,
    #[serde(with = "humantime_serde", default = "BenchConfig::default_cooldown")]
    pub cooldown: Duration,
    #[serde(with = "humantime_serde", default)]
    pub operation_timeout: Option<Duration>,
    #[serde(default = "BenchConfig::default_target")]
    pub target: i32,
    #[serde(default = "BenchConfig::default_search_term")]
    pub search_term: String,
    #[serde(default = "BenchConfig::default_limit")]
    pub limit: i64,
}

impl BenchConfig {
    fn default_iterations() -> usize {
        3
    }

    fn default_cooldown() -> Duration {
        Duration::from_secs(1)
    }

    fn default_target() -> i32 {
        4
    }

    fn default_search_term() -> String {
        String::from("love")
    }

    fn default_limit() -> i64 {
        100
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            iterations: Self::default_iterations(),
            cooldown: Self::default_cooldown(),
            operation_timeout: None,
            target: Self::default_target(),
            search_term: Self::default_search_term(),
            limit: Self::default_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    #[serde(default = "ReportConfig::default_path")]
    pub path: PathBuf,
}

impl ReportConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("./json/benchmark_report.json")
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
}
