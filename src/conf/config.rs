use std::path::Path;

use crate::{
    conf::{BenchConfig, LoadConfig, LoggingConfig, MongoConfig, PostgresConfig, ReportConfig, RetryConfig},
    core::BenchError::{self, ConfigParsingError},
};
use config::Config as CConfig;
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "SENTIBENCH";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub mongo: MongoConfig,
    #[serde(default)]
    pub postgres: PostgresConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub load: LoadConfig,
    #[serde(default)]
    pub bench: BenchConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_str(toml_str: &str) -> Result<Config, BenchError> {
        let config = CConfig::builder()
            .add_source(config::File::from_str(toml_str, config::FileFormat::Toml))
            .build()
            .map_err(|e| ConfigParsingError(e.to_string()))?
            .try_deserialize::<Config>()
            .map_err(|e| ConfigParsingError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the optional TOML file, then `SENTIBENCH_*` env vars
    /// (`__` separates section and key).
    pub fn load(path: Option<&Path>) -> Result<Config, BenchError> {
        let mut builder = CConfig::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path).format(config::FileFormat::Toml),
            );
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigParsingError(e.to_string()))?
            .try_deserialize::<Config>()
            .map_err(|e| ConfigParsingError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BenchError> {
        if self.load.batch_size == 0 {
            return Err(ConfigParsingError("load.batch_size must be positive".into()));
        }
        if self.load.memory_sample_every == 0 {
            return Err(ConfigParsingError(
                "load.memory_sample_every must be positive".into(),
            ));
        }
        if self.bench.iterations == 0 {
            return Err(ConfigParsingError("bench.iterations must be positive".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigParsingError("retry.max_attempts must be positive".into()));
        }
        if self.retry.multiplier < 1.0 {
            return Err(ConfigParsingError(format!(
                "retry.multiplier must be >= 1.0, got {}",
                self.retry.multiplier
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn load_empty_toml_gives_defaults() {
        let conf = Config::from_str("");
        assert_eq!(conf, Ok(Config::default()));
    }

    #[test]
    fn load_correct_toml() {
        let toml = r#"
        [postgres]
        host = "db.internal"
        port = 6543

        [retry]
        max_attempts = 5
        base_delay = "250ms"

        [bench]
        iterations = 10
        cooldown = "0s"
        operation_timeout = "30s"
        "#;
        let conf = Config::from_str(toml).unwrap();
        assert_eq!(conf.postgres.host, "db.internal");
        assert_eq!(conf.postgres.port, 6543);
        assert_eq!(conf.postgres.user, "postgres");
        assert_eq!(conf.retry.max_attempts, 5);
        assert_eq!(conf.retry.base_delay, Duration::from_millis(250));
        assert_eq!(conf.retry.multiplier, 2.0);
        assert_eq!(conf.bench.iterations, 10);
        assert_eq!(conf.bench.cooldown, Duration::ZERO);
        assert_eq!(conf.bench.operation_timeout, Some(Duration::from_secs(30)));
        assert_eq!(conf.load.batch_size, 5000);
    }

    #[test]
    fn reject_unknown_keys() {
        let toml = r#"
        [load]
        batch_sise = 10
        "#;
        assert!(matches!(Config::from_str(toml), Err(ConfigParsingError(_))));
    }

    #[test]
    fn reject_zero_batch_size() {
        let toml = r#"
        [load]
        batch_size = 0
        "#;
        let err = Config::from_str(toml).unwrap_err();
        assert_eq!(err, ConfigParsingError("load.batch_size must be positive".into()));
    }

    #[test]
    fn reject_shrinking_backoff() {
        let toml = r#"
        [retry]
        multiplier = 0.5
        "#;
        assert!(Config::from_str(toml).is_err());
    }
}
