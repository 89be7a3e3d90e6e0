use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MongoConfig {
    #[serde(default = "MongoConfig::default_uri")]
    pub uri: String,
    #[serde(default = "MongoConfig::default_database")]
    pub database: String,
    #[serde(default = "MongoConfig::default_collection")]
    pub collection: String,
    #[serde(
        with = "humantime_serde",
        default = "MongoConfig::default_server_selection_timeout"
    )]
    pub server_selection_timeout: Duration,
}

impl MongoConfig {
    fn default_uri() -> String {
        String::from("mongodb://localhost:27017/")
    }

    fn default_database() -> String {
        String::from("sentiment_analysis")
    }

    fn default_collection() -> String {
        String::from("tweets")
    }

    fn default_server_selection_timeout() -> Duration {
        Duration::from_secs(5)
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: Self::default_uri(),
            database: Self::default_database(),
            collection: Self::default_collection(),
            server_selection_timeout: Self::default_server_selection_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PostgresConfig {
    #[serde(default = "PostgresConfig::default_host")]
    pub host: String,
    #[serde(default = "PostgresConfig::default_port")]
    pub port: u16,
    #[serde(default = "PostgresConfig::default_user")]
    pub user: String,
    #[serde(default = "PostgresConfig::default_password")]
    pub password: String,
    #[serde(default = "PostgresConfig::default_dbname")]
    pub dbname: String,
    #[serde(
        with = "humantime_serde",
        default = "PostgresConfig::default_connect_timeout"
    )]
    pub connect_timeout: Duration,
}

impl PostgresConfig {
    fn default_host() -> String {
        String::from("localhost")
    }

    fn default_port() -> u16 {
        5432
    }

    fn default_user() -> String {
        String::from("postgres")
    }

    fn default_password() -> String {
        String::from("postgres")
    }

    fn default_dbname() -> String {
        String::from("sentiment_analysis")
    }

    fn default_connect_timeout() -> Duration {
        Duration::from_secs(5)
    }

    /// `host:port/dbname`, used to identify the target in logs. Never
    /// includes the password.
    pub fn target(&self) -> String {
        format!("postgres://{}@{}:{}/{}", self.user, self.host, self.port, self.dbname)
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            user: Self::default_user(),
            password: Self::default_password(),
            dbname: Self::default_dbname(),
            connect_timeout: Self::default_connect_timeout(),
        }
    }
}
